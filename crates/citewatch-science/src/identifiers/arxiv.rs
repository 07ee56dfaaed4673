use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScienceError};

// New format: YYMM.NNNN or YYMM.NNNNN (with optional version)
static NEW_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{4}\.\d{4,5})(v(\d+))?$").unwrap());

// Old format: category/YYMMNNN
static OLD_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z\-]+(?:\.[a-z]{2})?/\d{7})(v(\d+))?$").unwrap());

// An identifier inside an arxiv.org abstract or PDF link.
static IN_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)arxiv\.org/(?:abs|pdf)/(\d{4}\.\d{4,5}(?:v\d+)?|[a-z\-]+(?:\.[a-z]{2})?/\d{7}(?:v\d+)?)",
    )
    .unwrap()
});

/// A version-stripped arXiv identifier. Two links to different versions of
/// the same paper produce equal values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ArxivId {
    pub id: String,
    pub version: Option<u8>,
    pub category: Option<String>,
}

impl ArxivId {
    /// Parse a bare identifier, optionally `arXiv:`-prefixed.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let stripped = input
            .get(..6)
            .filter(|prefix| prefix.eq_ignore_ascii_case("arxiv:"))
            .map_or(input, |_| &input[6..]);

        if let Some(caps) = NEW_FORMAT.captures(stripped) {
            return Ok(Self {
                id: caps[1].to_string(),
                version: caps.get(3).and_then(|v| v.as_str().parse::<u8>().ok()),
                category: None,
            });
        }

        if let Some(caps) = OLD_FORMAT.captures(stripped) {
            let full_id = &caps[1];
            let category = full_id.split('/').next().map(ToOwned::to_owned);
            return Ok(Self {
                id: full_id.to_string(),
                version: caps.get(3).and_then(|v| v.as_str().parse::<u8>().ok()),
                category,
            });
        }

        Err(ScienceError::InvalidArxivId(input.to_string()))
    }

    /// Find an identifier in an `arxiv.org/abs/...` or `arxiv.org/pdf/...`
    /// link.
    pub fn from_url(url: &str) -> Option<Self> {
        let caps = IN_URL.captures(url)?;
        Self::parse(&caps[1]).ok()
    }

    pub fn abs_url(&self) -> String {
        format!("https://arxiv.org/abs/{}", self.id)
    }

    /// `<base>/<id>.pdf`, e.g. `https://arxiv.org/pdf/2301.00001.pdf`.
    pub fn pdf_url(&self, base: &str) -> String {
        format!("{}/{}.pdf", base.trim_end_matches('/'), self.id)
    }
}

impl fmt::Display for ArxivId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Version-stripped identifier found in `url`, if any.
pub fn extract_arxiv_id(url: &str) -> Option<String> {
    ArxivId::from_url(url).map(|id| id.id)
}
