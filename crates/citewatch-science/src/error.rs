use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScienceError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("invalid arXiv ID: {0}")]
    InvalidArxivId(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error from {0}: {1}")]
    ApiError(String, String),

    #[error("rate limit from {0}")]
    RateLimit(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] citewatch_core::CoreError),
}

impl ScienceError {
    /// Faults worth another attempt: rate limiting and transport failures.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimit(_) | Self::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, ScienceError>;
