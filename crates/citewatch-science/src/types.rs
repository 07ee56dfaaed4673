use serde::{Deserialize, Serialize};

use crate::error::ScienceError;

pub const UNKNOWN: &str = "Unknown";

/// Bibliographic data for one paper, as resolved from a metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub venue: String,
    /// Publication year as text; `"Unknown"` when no source knows it.
    pub year: String,
    /// Version-stripped arXiv identifier.
    pub arxiv_id: Option<String>,
    pub doi: Option<String>,
    pub pdf_url: Option<String>,
    pub citation_count: Option<u32>,
}

impl PaperRecord {
    /// Fill in a citation count discovered after the initial resolution.
    pub fn with_citation_count(mut self, count: Option<u32>) -> Self {
        if self.citation_count.is_none() {
            self.citation_count = count;
        }
        self
    }

    pub fn first_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }
}

/// Outcome of asking one source about one paper.
#[derive(Debug)]
pub enum Resolution {
    Found(PaperRecord),
    /// The source answered and has no such paper.
    NotFound,
    /// Rate limited or transport fault after retries were spent.
    TransientFailure(String),
    /// Any other failure: unexpected status, unparseable response.
    PermanentFailure(String),
}

impl Resolution {
    pub fn into_record(self) -> Option<PaperRecord> {
        match self {
            Self::Found(record) => Some(record),
            _ => None,
        }
    }
}

impl From<ScienceError> for Resolution {
    fn from(err: ScienceError) -> Self {
        match err {
            ScienceError::NotFound(_) => Self::NotFound,
            e if e.is_transient() => Self::TransientFailure(e.to_string()),
            e => Self::PermanentFailure(e.to_string()),
        }
    }
}
