use thiserror::Error;

/// All errors that can occur in citewatch-core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Directory does not exist: {0}")]
    DirectoryNotFound(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Watcher error: {0}")]
    Watch(#[from] notify_debouncer_mini::notify::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
