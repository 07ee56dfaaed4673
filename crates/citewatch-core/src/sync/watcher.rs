use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};

/// Coalescing interval of the underlying notifier. The per-note debounce
/// window is applied later by [`super::PendingNotes`].
const NOTIFY_TIMEOUT: Duration = Duration::from_millis(250);

/// A note file changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    pub path: PathBuf,
    pub at: Instant,
}

/// Watches a single directory (non-recursive) for changes to note files.
pub struct NoteWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    directory: PathBuf,
}

impl NoteWatcher {
    /// Start watching `directory`. Raw notifications are filtered on a
    /// background thread and forwarded as [`NoteEvent`]s through the returned
    /// channel.
    pub fn start(
        directory: PathBuf,
        extensions: Vec<String>,
    ) -> Result<(Self, mpsc::Receiver<NoteEvent>)> {
        if !directory.is_dir() {
            return Err(CoreError::DirectoryNotFound(
                directory.to_string_lossy().to_string(),
            ));
        }

        let (raw_tx, raw_rx) = mpsc::channel::<DebounceEventResult>();
        let (event_tx, event_rx) = mpsc::channel::<NoteEvent>();

        let mut debouncer = new_debouncer(NOTIFY_TIMEOUT, move |res: DebounceEventResult| {
            let _ = raw_tx.send(res);
        })?;
        debouncer
            .watcher()
            .watch(&directory, RecursiveMode::NonRecursive)?;

        std::thread::spawn(move || forward_events(raw_rx, event_tx, extensions));

        Ok((
            Self {
                _debouncer: debouncer,
                directory,
            },
            event_rx,
        ))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn forward_events(
    raw_rx: mpsc::Receiver<DebounceEventResult>,
    event_tx: mpsc::Sender<NoteEvent>,
    extensions: Vec<String>,
) {
    while let Ok(res) = raw_rx.recv() {
        match res {
            Ok(events) => {
                for event in events {
                    if !is_note_path(&event.path, event.path.is_dir(), &extensions) {
                        continue;
                    }
                    debug!(path = %event.path.display(), "note changed");
                    let note = NoteEvent {
                        path: event.path,
                        at: Instant::now(),
                    };
                    if event_tx.send(note).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "watcher error");
            }
        }
    }
}

/// Whether a changed path is a note this tool cares about.
pub fn is_note_path(path: &Path, is_directory: bool, extensions: &[String]) -> bool {
    if is_directory {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// Note files directly inside `directory`, sorted by path.
pub fn list_notes(directory: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(CoreError::DirectoryNotFound(
            directory.to_string_lossy().to_string(),
        ));
    }
    let mut notes = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if is_note_path(&path, path.is_dir(), extensions) {
            notes.push(path);
        }
    }
    notes.sort();
    Ok(notes)
}
