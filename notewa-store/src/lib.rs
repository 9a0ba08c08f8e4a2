//! notewa-store: file-backed users, notes and history; the sweep's candidate source.

pub mod file_store;
pub mod model;
mod source;

pub use file_store::{FileStore, DEFAULT_HISTORY_LIMIT};
pub use model::{HistoryAction, NewNote, Note, NoteHistory, NoteUpdate, User};
