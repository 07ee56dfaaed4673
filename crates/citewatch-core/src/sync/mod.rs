pub mod pending;
pub mod watch_loop;
pub mod watcher;

pub use pending::PendingNotes;
pub use watch_loop::{NoteProcessor, WatchLoop};
pub use watcher::{NoteEvent, NoteWatcher, is_note_path, list_notes};
