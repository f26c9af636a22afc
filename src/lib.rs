//! Conversion between note lists in seconds and standard MIDI files.
//!
//! [`export_notes`] writes a single-track file from notes, [`import_notes`]
//! reads any file back into notes, optionally stretched to a reference
//! duration.

pub mod constants;
pub mod error;
pub mod note;
pub mod reference;
pub mod timing;
pub mod midi {
    pub mod active_notes;
    pub mod events;
    pub mod export;
    pub mod import;
}

pub use error::{Error, Result};
pub use midi::export::{export_notes, export_notes_to_path, ExportOptions, NoteOffStyle};
pub use midi::import::{import_notes, import_notes_from_path, rescale_notes, ImportOptions};
pub use note::{notes_from_json, notes_to_json, Note, NoteRecord};
pub use reference::reference_duration_from_wav;
