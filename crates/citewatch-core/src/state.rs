//! Persisted record of which links have been handled and what each note
//! looked like after its last rewrite.
//!
//! The whole document is rewritten on every mutation so a crash never loses
//! a link that was already marked.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::Result;

/// Minimal snapshot of what a processed link resolved to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arxiv_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEntry {
    pub processed_at: DateTime<Utc>,
    pub info: ProcessedInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub processed_urls: BTreeMap<String, ProcessedEntry>,
    #[serde(default)]
    pub file_hashes: BTreeMap<String, String>,
}

pub struct ProcessedStateStore {
    path: PathBuf,
    state: PersistedState,
}

impl ProcessedStateStore {
    /// Open the state document at `path`. A missing or unreadable document
    /// starts out empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load_state(&path);
        Self { path, state }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn processed_count(&self) -> usize {
        self.state.processed_urls.len()
    }

    /// Exact-string lookup of a raw URL as it appeared in a note.
    pub fn is_processed(&self, url: &str) -> bool {
        self.state.processed_urls.contains_key(url)
    }

    pub fn entry(&self, url: &str) -> Option<&ProcessedEntry> {
        self.state.processed_urls.get(url)
    }

    /// Record `url` as handled and flush to disk. Returns `false` without
    /// touching the existing entry when the URL was already recorded.
    pub fn mark_processed(&mut self, url: &str, info: ProcessedInfo) -> Result<bool> {
        if self.is_processed(url) {
            debug!(url, "link already recorded");
            return Ok(false);
        }
        self.state.processed_urls.insert(
            url.to_string(),
            ProcessedEntry {
                processed_at: Utc::now(),
                info,
            },
        );
        if let Err(e) = self.save() {
            self.state.processed_urls.remove(url);
            return Err(e);
        }
        Ok(true)
    }

    /// SHA-256 of the note's full text, hex encoded.
    pub fn content_hash(&self, note: &Path) -> Result<String> {
        let text = fs::read_to_string(note)?;
        Ok(hash_text(&text))
    }

    /// Whether the note's current text differs from the last recorded digest.
    pub fn has_changed(&self, note: &Path) -> Result<bool> {
        let current = self.content_hash(note)?;
        let previous = self.state.file_hashes.get(&note_key(note));
        Ok(previous != Some(&current))
    }

    pub fn update_hash(&mut self, note: &Path) -> Result<()> {
        let digest = self.content_hash(note)?;
        self.state.file_hashes.insert(note_key(note), digest);
        self.save()
    }

    /// Write the whole document next to its final location, then rename it
    /// into place.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(&self.state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &payload)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

pub fn hash_text(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn note_key(note: &Path) -> String {
    std::path::absolute(note)
        .unwrap_or_else(|_| note.to_path_buf())
        .to_string_lossy()
        .to_string()
}

fn load_state(path: &Path) -> PersistedState {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PersistedState::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read state file, starting empty");
            return PersistedState::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(state) => state,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt state file, starting empty");
            PersistedState::default()
        }
    }
}
