use std::io::Cursor;
use std::path::Path;

use log::{debug, warn};
use midly::num::u7;
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEventKind};

use crate::constants::{
    DEFAULT_CHANNEL, DEFAULT_TEMPO_BPM, DEFAULT_TICKS_PER_QUARTER, MAX_CHANNEL, MAX_DELTA_TICKS,
    MAX_MIDI_VALUE, MAX_TICKS_PER_QUARTER,
};
use crate::error::{Error, Result};
use crate::note::Note;
use crate::timing::{bpm_to_microseconds_per_quarter, seconds_to_ticks};

use super::events::{to_delta_events, TrackEventAbsolute};

/// How a note end is written to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteOffStyle {
    /// A real note-off message with velocity 0.
    #[default]
    NoteOff,
    /// A note-on with velocity 0.
    ZeroVelocityNoteOn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub tempo_bpm: f64,
    pub ticks_per_quarter: u16,
    pub channel: u8,
    /// Track length in seconds. Never moves the end marker before the last note.
    pub track_duration_seconds: Option<f64>,
    pub note_off_style: NoteOffStyle,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            ticks_per_quarter: DEFAULT_TICKS_PER_QUARTER,
            channel: DEFAULT_CHANNEL,
            track_duration_seconds: None,
            note_off_style: NoteOffStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScheduledKind {
    NoteOff { pitch: u8 },
    NoteOn { pitch: u8, velocity: u8 },
}

#[derive(Debug, Clone, Copy)]
struct ScheduledEvent {
    seconds: f64,
    /// Tie-break at equal times: offs, then ons, then offs of zero-length notes.
    rank: u8,
    /// End of the owning note. Ons at equal times open the longest note first,
    /// so the first note-off closes the note that really ends there.
    note_end: f64,
    kind: ScheduledKind,
}

fn validate_options(options: &ExportOptions) -> Result<u32> {
    if options.channel > MAX_CHANNEL {
        return Err(Error::MalformedInput(format!("channel {} is outside 0-15", options.channel)));
    }
    if options.ticks_per_quarter == 0 || options.ticks_per_quarter > MAX_TICKS_PER_QUARTER {
        return Err(Error::MalformedInput(format!(
            "ticks per quarter {} is outside 1-32767",
            options.ticks_per_quarter
        )));
    }
    bpm_to_microseconds_per_quarter(options.tempo_bpm)
}

fn schedule_notes(notes: &[Note]) -> Result<Vec<ScheduledEvent>> {
    if let Some(note) = notes.iter().find(|n| !n.start.is_finite() || !n.end.is_finite()) {
        return Err(Error::MalformedInput(format!("note times must be finite: {:?}", note)));
    }
    if let Some(note) = notes.iter().find(|n| n.pitch > MAX_MIDI_VALUE || n.velocity > MAX_MIDI_VALUE) {
        return Err(Error::MalformedInput(format!(
            "pitch and velocity must be within 0-127: {:?}",
            note
        )));
    }

    let mut sorted = notes.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

    let mut scheduled = Vec::with_capacity(sorted.len() * 2);
    for note in sorted {
        let start = note.start.max(0.0);
        let end = note.end.max(start);
        let velocity = if note.velocity == 0 {
            warn!("note {} at {:.3}s has velocity 0, writing it as 1", note.pitch, start);
            1
        } else {
            note.velocity
        };

        scheduled.push(ScheduledEvent {
            seconds: start,
            rank: 1,
            note_end: end,
            kind: ScheduledKind::NoteOn { pitch: note.pitch, velocity },
        });
        scheduled.push(ScheduledEvent {
            seconds: end,
            rank: if end == start { 2 } else { 0 },
            note_end: end,
            kind: ScheduledKind::NoteOff { pitch: note.pitch },
        });
    }

    scheduled.sort_by(|a, b| {
        a.seconds
            .total_cmp(&b.seconds)
            .then(a.rank.cmp(&b.rank))
            .then(b.note_end.total_cmp(&a.note_end))
    });

    Ok(scheduled)
}

/// Build the absolute-tick event list of the exported track: tempo marker,
/// note events ordered by time with offs before ons, then the end marker.
///
/// # Arguments
///
/// * `notes` - Notes in any order.
/// * `options` - Tempo, resolution, channel and optional track length.
///
/// # Returns
///
/// * Events sorted by absolute tick.
pub fn generate_ordered_midi_events(
    notes: &[Note],
    options: &ExportOptions,
) -> Result<Vec<TrackEventAbsolute<'static>>> {
    let tempo = validate_options(options)?;
    let scheduled = schedule_notes(notes)?;
    let channel = options.channel.into();
    let ticks_per_quarter = options.ticks_per_quarter;

    let mut track_events_absolute = Vec::with_capacity(scheduled.len() + 2);
    track_events_absolute.push(TrackEventAbsolute {
        tick: 0,
        kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo.into())),
    });

    // Quantize absolute times so rounding never accumulates across deltas.
    for event in &scheduled {
        let message = match (event.kind, options.note_off_style) {
            (ScheduledKind::NoteOn { pitch, velocity }, _) => MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(velocity),
            },
            (ScheduledKind::NoteOff { pitch }, NoteOffStyle::NoteOff) => MidiMessage::NoteOff {
                key: u7::new(pitch),
                vel: u7::new(0),
            },
            (ScheduledKind::NoteOff { pitch }, NoteOffStyle::ZeroVelocityNoteOn) => MidiMessage::NoteOn {
                key: u7::new(pitch),
                vel: u7::new(0),
            },
        };

        track_events_absolute.push(TrackEventAbsolute {
            tick: seconds_to_ticks(event.seconds, ticks_per_quarter, tempo),
            kind: TrackEventKind::Midi { channel, message },
        });
    }

    let last_event_seconds = scheduled.last().map_or(0.0, |event| event.seconds);
    let track_length_seconds = match options.track_duration_seconds {
        Some(duration) if duration > last_event_seconds => duration,
        Some(duration) => {
            if duration < last_event_seconds {
                warn!(
                    "track duration {:.3}s ends before the last event at {:.3}s, extending it",
                    duration, last_event_seconds
                );
            }
            last_event_seconds
        }
        None => last_event_seconds,
    };

    let end_tick = seconds_to_ticks(track_length_seconds, ticks_per_quarter, tempo);
    if end_tick > MAX_DELTA_TICKS {
        return Err(Error::MalformedInput(format!(
            "track length {:.3}s needs {} ticks, more than a track can hold",
            track_length_seconds, end_tick
        )));
    }
    track_events_absolute.push(TrackEventAbsolute {
        tick: end_tick,
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    Ok(track_events_absolute)
}

/// Generate single-track MIDI file data from notes.
///
/// # Arguments
///
/// * `notes` - Notes in seconds, in any order.
/// * `options` - Export settings.
///
/// # Returns
///
/// * A vector of bytes representing the MIDI file.
pub fn export_notes(notes: &[Note], options: &ExportOptions) -> Result<Vec<u8>> {
    let track_events_absolute = generate_ordered_midi_events(notes, options)?;
    let track: Track = to_delta_events(&track_events_absolute);

    let mut smf = Smf::new(Header {
        format: Format::SingleTrack,
        timing: Timing::Metrical(options.ticks_per_quarter.into()),
    });
    smf.tracks.push(track);

    let mut buffer = Vec::new();
    smf.write_std(&mut Cursor::new(&mut buffer))?;

    debug!(
        "exported {} notes as {} events ({} bytes)",
        notes.len(),
        track_events_absolute.len(),
        buffer.len()
    );

    Ok(buffer)
}

/// Export notes and write the file to `path`.
pub fn export_notes_to_path<P: AsRef<Path>>(notes: &[Note], options: &ExportOptions, path: P) -> Result<()> {
    let buffer = export_notes(notes, options)?;
    std::fs::write(path, buffer)?;
    Ok(())
}
