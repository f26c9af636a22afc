use std::path::Path;

use log::{debug, warn};
use midly::{Format, MetaMessage, MidiMessage, Smf, TrackEventKind};

use crate::error::Result;
use crate::note::Note;
use crate::timing::{microseconds_per_quarter_to_bpm, Resolution};

use super::active_notes::ActiveNotes;
use super::events::merge_tracks;

/// Tempo assumed until the first tempo marker (120 BPM).
pub const DEFAULT_MICROSECONDS_PER_QUARTER: u32 = 500_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOptions {
    /// Stretch the imported timeline so it lasts exactly this long.
    pub target_duration_seconds: Option<f64>,
}

/// Tempo in effect after a tempo marker. A zero marker would freeze time, so
/// it is ignored.
pub fn tempo_after_marker(current: u32, marker: u32) -> u32 {
    if marker == 0 {
        warn!("ignoring tempo marker of 0 microseconds per quarter");
        current
    } else {
        marker
    }
}

/// Factor mapping the observed timeline onto `target_seconds`, or `None`
/// when no sensible factor exists.
pub fn rescale_factor(target_seconds: f64, observed_seconds: f64) -> Option<f64> {
    if !(observed_seconds > 0.0) {
        return None;
    }
    let factor = target_seconds / observed_seconds;
    (factor.is_finite() && factor > 0.0).then_some(factor)
}

pub fn rescale_notes(notes: &mut [Note], factor: f64) {
    for note in notes.iter_mut() {
        note.start *= factor;
        note.end *= factor;
    }
}

/// Read notes from MIDI file data.
///
/// All tracks are merged into one timeline. Note-offs (or zero-velocity
/// note-ons) close the most recent open note of the same channel and pitch;
/// unmatched ones are dropped, and notes still open at the end are closed at
/// the final timestamp.
///
/// # Arguments
///
/// * `data` - Bytes of a standard MIDI file.
/// * `options` - Optional duration to stretch the result to.
///
/// # Returns
///
/// * Notes sorted by start, end, then pitch.
pub fn import_notes(data: &[u8], options: &ImportOptions) -> Result<Vec<Note>> {
    let smf = Smf::parse(data)?;
    let resolution = Resolution::from_timing(smf.header.timing)?;
    if smf.header.format == Format::Sequential {
        debug!("merging {} independent sequences into one timeline", smf.tracks.len());
    }

    let merged = merge_tracks(&smf.tracks);

    let mut tempo = DEFAULT_MICROSECONDS_PER_QUARTER;
    let mut absolute_seconds = 0.0;
    let mut previous_tick = 0;
    let mut active = ActiveNotes::new();
    let mut notes = Vec::new();
    let mut unmatched_offs = 0usize;

    for event in &merged {
        // tempo changes only affect later deltas
        absolute_seconds += resolution.ticks_to_seconds(event.tick - previous_tick, tempo);
        previous_tick = event.tick;

        match event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(marker)) => {
                tempo = tempo_after_marker(tempo, marker.as_int());
                debug!(
                    "tempo {:.2} BPM from {:.3}s",
                    microseconds_per_quarter_to_bpm(tempo),
                    absolute_seconds
                );
            }
            TrackEventKind::Midi { channel, message } => match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                    active.open(channel.as_int(), key.as_int(), absolute_seconds, vel.as_int());
                }
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    match active.close(channel.as_int(), key.as_int(), absolute_seconds) {
                        Some(note) => notes.push(note),
                        None => unmatched_offs += 1,
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    if unmatched_offs > 0 {
        warn!("dropped {} note-off events with no open note", unmatched_offs);
    }
    if !active.is_empty() {
        warn!("closing {} notes still held at {:.3}s", active.len(), absolute_seconds);
        notes.extend(active.close_all(absolute_seconds));
    }

    if let Some(target) = options.target_duration_seconds {
        match rescale_factor(target, absolute_seconds) {
            Some(factor) => rescale_notes(&mut notes, factor),
            None => warn!(
                "not rescaling: target {}s against observed {:.3}s",
                target, absolute_seconds
            ),
        }
    }

    notes.sort_by(Note::timeline_cmp);

    debug!(
        "imported {} notes from {} tracks spanning {:.3}s",
        notes.len(),
        smf.tracks.len(),
        absolute_seconds
    );

    Ok(notes)
}

/// Read the MIDI file at `path` and import its notes.
pub fn import_notes_from_path<P: AsRef<Path>>(path: P, options: &ImportOptions) -> Result<Vec<Note>> {
    let data = std::fs::read(path)?;
    import_notes(&data, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use midly::num::u7;
    use midly::{Header, Timing, Track, TrackEvent};

    fn midi(delta: u32, channel: u8, message: MidiMessage) -> TrackEvent<'static> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi { channel: channel.into(), message },
        }
    }

    fn on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
        midi(delta, 0, MidiMessage::NoteOn { key: u7::new(key), vel: u7::new(vel) })
    }

    fn off(delta: u32, key: u8) -> TrackEvent<'static> {
        midi(delta, 0, MidiMessage::NoteOff { key: u7::new(key), vel: u7::new(0) })
    }

    fn meta(delta: u32, message: MetaMessage<'static>) -> TrackEvent<'static> {
        TrackEvent { delta: delta.into(), kind: TrackEventKind::Meta(message) }
    }

    fn file(format: Format, tracks: Vec<Track<'static>>) -> Vec<u8> {
        let mut smf = midly::Smf::new(Header { format, timing: Timing::Metrical(480u16.into()) });
        smf.tracks = tracks;
        let mut buffer = Vec::new();
        smf.write_std(&mut buffer).unwrap();
        buffer
    }

    fn single(track: Track<'static>) -> Vec<u8> {
        file(Format::SingleTrack, vec![track])
    }

    fn import(data: &[u8]) -> Vec<Note> {
        import_notes(data, &ImportOptions::default()).unwrap()
    }

    #[test]
    fn lifo_pairing_of_overlapping_notes() {
        // on at 0.5s and 1.0s, offs at 1.5s and 2.0s (default 120 BPM)
        let data = single(vec![
            on(480, 60, 90),
            on(480, 60, 70),
            off(480, 60),
            off(480, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]);

        assert_eq!(import(&data), vec![Note::new(60, 0.5, 2.0, 90), Note::new(60, 1.0, 1.5, 70)]);
    }

    #[test]
    fn zero_velocity_note_on_closes_a_note() {
        let data = single(vec![on(0, 64, 100), on(960, 64, 0), meta(0, MetaMessage::EndOfTrack)]);
        assert_eq!(import(&data), vec![Note::new(64, 0.0, 1.0, 100)]);
    }

    #[test]
    fn unmatched_note_off_is_dropped() {
        let data = single(vec![off(0, 60), off(480, 61), meta(0, MetaMessage::EndOfTrack)]);
        assert!(import(&data).is_empty());
    }

    #[test]
    fn channels_pair_independently() {
        let data = single(vec![
            midi(0, 1, MidiMessage::NoteOn { key: u7::new(60), vel: u7::new(100) }),
            // off on channel 0 must not close the channel 1 note
            off(480, 60),
            midi(480, 1, MidiMessage::NoteOff { key: u7::new(60), vel: u7::new(0) }),
            meta(0, MetaMessage::EndOfTrack),
        ]);

        assert_eq!(import(&data), vec![Note::new(60, 0.0, 1.0, 100)]);
    }

    #[test]
    fn dangling_notes_close_at_final_time() {
        let data = single(vec![
            on(0, 60, 100),
            on(480, 67, 100),
            meta(1440, MetaMessage::EndOfTrack),
        ]);

        assert_eq!(import(&data), vec![Note::new(60, 0.0, 2.0, 100), Note::new(67, 0.5, 2.0, 100)]);
    }

    #[test]
    fn tempo_change_applies_to_following_deltas_only() {
        let data = single(vec![
            on(0, 60, 100),
            // the delta before this marker is still at 120 BPM
            meta(960, MetaMessage::Tempo(1_000_000u32.into())),
            off(960, 60),
            meta(0, MetaMessage::EndOfTrack),
        ]);

        assert_eq!(import(&data), vec![Note::new(60, 0.0, 3.0, 100)]);
    }

    #[test]
    fn zero_tempo_marker_is_ignored() {
        assert_eq!(tempo_after_marker(500_000, 0), 500_000);
        assert_eq!(tempo_after_marker(500_000, 250_000), 250_000);
    }

    #[test]
    fn tracks_are_merged_onto_one_timeline() {
        let data = file(
            Format::Parallel,
            vec![
                vec![meta(0, MetaMessage::Tempo(250_000u32.into())), meta(0, MetaMessage::EndOfTrack)],
                vec![on(480, 60, 100), off(480, 60), meta(0, MetaMessage::EndOfTrack)],
            ],
        );

        // 240 BPM: 480 ticks = 0.25s
        assert_eq!(import(&data), vec![Note::new(60, 0.25, 0.5, 100)]);
    }

    #[test]
    fn rescales_to_target_duration() {
        let data = single(vec![on(0, 60, 100), off(960, 60), meta(960, MetaMessage::EndOfTrack)]);
        let options = ImportOptions { target_duration_seconds: Some(4.0) };

        let notes = import_notes(&data, &options).unwrap();
        assert_eq!(notes, vec![Note::new(60, 0.0, 2.0, 100)]);
    }

    #[test]
    fn rescale_is_skipped_for_bad_factors() {
        assert_eq!(rescale_factor(2.0, 0.0), None);
        assert_eq!(rescale_factor(0.0, 2.0), None);
        assert_eq!(rescale_factor(-1.0, 2.0), None);
        assert_eq!(rescale_factor(f64::NAN, 2.0), None);
        assert_eq!(rescale_factor(f64::INFINITY, 2.0), None);
        assert_eq!(rescale_factor(3.0, 2.0), Some(1.5));

        // empty file: observed duration is 0, notes untouched
        let data = single(vec![meta(0, MetaMessage::EndOfTrack)]);
        let options = ImportOptions { target_duration_seconds: Some(4.0) };
        assert!(import_notes(&data, &options).unwrap().is_empty());
    }

    #[test]
    fn rescale_by_inverse_restores_times() {
        let original = vec![Note::new(60, 0.3, 1.7, 100), Note::new(62, 2.0, 2.5, 80)];
        let mut notes = original.clone();

        rescale_notes(&mut notes, 1.0);
        assert_eq!(notes, original);

        rescale_notes(&mut notes, 3.0);
        rescale_notes(&mut notes, 1.0 / 3.0);
        for (restored, expected) in notes.iter().zip(&original) {
            assert!((restored.start - expected.start).abs() < 1e-12);
            assert!((restored.end - expected.end).abs() < 1e-12);
        }
    }

    #[test]
    fn output_is_sorted_by_start_end_pitch() {
        let data = single(vec![
            on(0, 72, 100),
            on(0, 60, 100),
            on(0, 65, 100),
            off(480, 72),
            off(0, 60),
            off(480, 65),
            meta(0, MetaMessage::EndOfTrack),
        ]);

        let pitches: Vec<u8> = import(&data).iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 72, 65]);
    }

    #[test]
    fn structurally_invalid_data_is_a_parse_error() {
        assert!(matches!(import_notes(b"not a midi file", &ImportOptions::default()), Err(Error::Parse(_))));
        assert!(matches!(import_notes(&[], &ImportOptions::default()), Err(Error::Parse(_))));

        let data = single(vec![on(0, 60, 100), off(960, 60), meta(0, MetaMessage::EndOfTrack)]);
        assert!(matches!(
            import_notes(&data[..data.len() - 2], &ImportOptions::default()),
            Err(Error::Parse(_))
        ));
    }
}
