use std::collections::BTreeMap;

use crate::note::Note;

/// Notes that have started but not yet ended, keyed by `(channel, pitch)`.
///
/// Each key holds a stack: a note-off always closes the most recently opened
/// note of the same channel and pitch.
#[derive(Debug, Default)]
pub struct ActiveNotes {
    held: BTreeMap<(u8, u8), Vec<(f64, u8)>>,
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, channel: u8, pitch: u8, start: f64, velocity: u8) {
        self.held.entry((channel, pitch)).or_default().push((start, velocity));
    }

    /// Close the last-opened note for the key. Returns `None` for an unmatched
    /// note-off, which callers drop.
    pub fn close(&mut self, channel: u8, pitch: u8, end: f64) -> Option<Note> {
        let stack = self.held.get_mut(&(channel, pitch))?;
        let (start, velocity) = stack.pop()?;
        if stack.is_empty() {
            self.held.remove(&(channel, pitch));
        }
        Some(Note::new(pitch, start, end, velocity))
    }

    /// Close every held note at `end`, whatever its key or start time.
    pub fn close_all(&mut self, end: f64) -> Vec<Note> {
        std::mem::take(&mut self.held)
            .into_iter()
            .flat_map(|((_, pitch), stack)| {
                stack
                    .into_iter()
                    .map(move |(start, velocity)| Note::new(pitch, start, end, velocity))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.held.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
