use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_VELOCITY, MAX_MIDI_VALUE};
use crate::error::{Error, Result};

/// A single note in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub start: f64,
    pub end: f64,
    pub velocity: u8,
}

impl Note {
    /// Create a note, pulling `end` up to `start` if it lies before it.
    pub fn new(pitch: u8, start: f64, end: f64, velocity: u8) -> Self {
        Note {
            pitch,
            start,
            end: end.max(start),
            velocity,
        }
    }

    /// Ordering used for import output: start, then end, then pitch.
    pub fn timeline_cmp(&self, other: &Note) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then(self.end.total_cmp(&other.end))
            .then(self.pitch.cmp(&other.pitch))
    }
}

fn default_velocity() -> i64 {
    DEFAULT_VELOCITY as i64
}

/// A note as it arrives from a caller, before validation.
///
/// Accepts either `[pitch, start, end, velocity]` or
/// `{"pitch": .., "start": .., "end": .., "velocity": ..}` with an optional velocity.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NoteRecord {
    Tuple(i64, f64, f64, i64),
    Fields {
        pitch: i64,
        start: f64,
        end: f64,
        #[serde(default = "default_velocity")]
        velocity: i64,
    },
}

fn midi_value(name: &str, value: i64) -> Result<u8> {
    if (0..=MAX_MIDI_VALUE as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(Error::MalformedInput(format!("{} {} is outside 0-127", name, value)))
    }
}

impl TryFrom<NoteRecord> for Note {
    type Error = Error;

    fn try_from(record: NoteRecord) -> Result<Note> {
        let (pitch, start, end, velocity) = match record {
            NoteRecord::Tuple(pitch, start, end, velocity) => (pitch, start, end, velocity),
            NoteRecord::Fields { pitch, start, end, velocity } => (pitch, start, end, velocity),
        };

        if !start.is_finite() || !end.is_finite() {
            return Err(Error::MalformedInput(format!(
                "note times must be finite, got start {} end {}",
                start, end
            )));
        }

        Ok(Note {
            pitch: midi_value("pitch", pitch)?,
            start,
            end,
            velocity: midi_value("velocity", velocity)?,
        })
    }
}

/// Parse a JSON array of note records.
pub fn notes_from_json(text: &str) -> Result<Vec<Note>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(text)
        .map_err(|e| Error::MalformedInput(format!("expected a JSON array of notes: {}", e)))?;

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let record: NoteRecord = serde_json::from_value(value).map_err(|_| {
                Error::MalformedInput(format!(
                    "note {} is not [pitch, start, end, velocity] or an object with pitch/start/end",
                    i
                ))
            })?;
            Note::try_from(record)
        })
        .collect()
}

/// Serialize notes as a pretty-printed JSON array of objects.
pub fn notes_to_json(notes: &[Note]) -> Result<String> {
    serde_json::to_string_pretty(notes)
        .map_err(|e| Error::MalformedInput(format!("cannot serialize notes: {}", e)))
}
