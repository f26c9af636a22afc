use midly::{MetaMessage, Track, TrackEvent, TrackEventKind};

/// A track event positioned by absolute tick instead of delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackEventAbsolute<'a> {
    pub tick: u32,
    pub kind: TrackEventKind<'a>,
}

/// Turn events sorted by absolute tick into delta-timed track events.
///
/// Callers guarantee every tick fits the 28-bit delta field.
pub fn to_delta_events<'a>(events: &[TrackEventAbsolute<'a>]) -> Vec<TrackEvent<'a>> {
    let mut previous_tick = 0;
    events
        .iter()
        .map(|event| {
            let delta = event.tick.saturating_sub(previous_tick);
            previous_tick = event.tick;
            TrackEvent {
                delta: delta.into(),
                kind: event.kind,
            }
        })
        .collect()
}

/// Merge any number of tracks into one stream ordered by absolute tick.
///
/// Events on the same tick keep track order, then in-track order. Every
/// per-track end-of-track marker is dropped and a single one is appended at
/// the latest track end, so the stream spans the longest track.
pub fn merge_tracks<'a>(tracks: &[Track<'a>]) -> Vec<TrackEventAbsolute<'a>> {
    let mut merged = Vec::with_capacity(tracks.iter().map(|t| t.len()).sum::<usize>() + 1);
    let mut end_tick = 0;

    for track in tracks {
        let mut tick: u32 = 0;
        for event in track {
            tick = tick.saturating_add(event.delta.as_int());
            if let TrackEventKind::Meta(MetaMessage::EndOfTrack) = event.kind {
                continue;
            }
            merged.push(TrackEventAbsolute { tick, kind: event.kind });
        }
        end_tick = end_tick.max(tick);
    }

    // stable, so equal ticks keep their insertion order
    merged.sort_by_key(|event| event.tick);
    merged.push(TrackEventAbsolute {
        tick: end_tick,
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    merged
}
