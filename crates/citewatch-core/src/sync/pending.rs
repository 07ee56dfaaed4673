use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Per-note debounce state: `idle -> pending -> processing -> idle`.
///
/// A notification for a note within `window` of its last *accepted*
/// notification is dropped.
#[derive(Debug)]
pub struct PendingNotes {
    window: Duration,
    last_accepted: HashMap<PathBuf, Instant>,
    pending: BTreeSet<PathBuf>,
}

impl PendingNotes {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
            pending: BTreeSet::new(),
        }
    }

    /// Register a change notification. Returns whether it was accepted.
    pub fn notify(&mut self, path: PathBuf, at: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(&path)
            && at.saturating_duration_since(*last) < self.window
        {
            return false;
        }
        self.last_accepted.insert(path.clone(), at);
        self.pending.insert(path);
        true
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every pending note; each leaves the pending set whatever happens
    /// to it afterwards.
    pub fn drain(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.pending).into_iter().collect()
    }
}
