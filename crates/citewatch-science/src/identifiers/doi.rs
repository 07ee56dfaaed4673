use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScienceError};

// A DOI behind a doi.org link or a literal `doi:` prefix.
static IN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:doi\.org/|doi:\s*)(10\.\d{4,}/[^\s)]+)").unwrap()
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doi {
    pub raw: String,
    pub normalized: String,
    pub url: String,
}

impl Doi {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let stripped = ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/"]
            .iter()
            .find_map(|prefix| input.strip_prefix(prefix))
            .or_else(|| {
                input
                    .get(..4)
                    .filter(|p| p.eq_ignore_ascii_case("doi:"))
                    .map(|_| input[4..].trim_start())
            })
            .unwrap_or(input)
            .trim_end_matches('.');

        // Must start with "10.", contain "/", and have a non-empty suffix
        if !stripped.starts_with("10.") {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        }
        let slash_pos = stripped
            .find('/')
            .ok_or_else(|| ScienceError::InvalidDoi(input.to_string()))?;
        if stripped[slash_pos + 1..].is_empty() {
            return Err(ScienceError::InvalidDoi(input.to_string()));
        }

        let normalized = stripped.to_lowercase();
        let url = format!("https://doi.org/{normalized}");

        Ok(Self {
            raw: input.to_string(),
            normalized,
            url,
        })
    }

    /// Find a DOI in a `doi.org/...` link or a `doi:` reference.
    pub fn from_link(link: &str) -> Option<Self> {
        let caps = IN_LINK.captures(link)?;
        Self::parse(&caps[1]).ok()
    }
}

/// DOI found in `link` with trailing periods stripped, if any.
pub fn extract_doi(link: &str) -> Option<String> {
    let caps = IN_LINK.captures(link)?;
    let doi = caps[1].trim_end_matches('.');
    (!doi.ends_with('/')).then(|| doi.to_string())
}
