use once_cell::sync::Lazy;
use regex::Regex;

use crate::identifiers::{arxiv::ArxivId, doi::Doi};

// http(s) links, plus bare `doi:` references.
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https?://[^\s)\]<>"']+|doi:\s*10\.\d{4,}/[^\s)\]<>"']+"#).unwrap()
});

/// What a link in a note points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperLink {
    Arxiv(ArxivId),
    Doi(Doi),
    Unknown,
}

impl PaperLink {
    /// arXiv wins over DOI when a link carries both.
    pub fn classify(url: &str) -> Self {
        if let Some(id) = ArxivId::from_url(url) {
            return Self::Arxiv(id);
        }
        if let Some(doi) = Doi::from_link(url) {
            return Self::Doi(doi);
        }
        Self::Unknown
    }
}

/// Candidate links in `text`, in order of appearance, with trailing `.,;:`
/// removed. Repeated links are kept.
pub fn find_urls(text: &str) -> Vec<String> {
    URL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':']).to_string())
        .collect()
}

/// Like [`find_urls`], keeping only the first occurrence of each link.
pub fn find_unique_urls(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    find_urls(text)
        .into_iter()
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
