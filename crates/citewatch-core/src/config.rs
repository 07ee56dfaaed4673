use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Root application configuration, loaded from `~/.config/citewatch/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub watch: WatchConfig,
    pub network: NetworkConfig,
    pub endpoints: EndpointConfig,
    pub throttle: ThrottleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub directory: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub debounce_secs: u64,
    pub poll_interval_ms: u64,
}

/// Transport settings handed to every component that talks to the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    pub use_proxy: bool,
    pub timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub semantic_scholar: String,
    pub arxiv_api: String,
    pub arxiv_pdf: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub link_pause_secs: u64,
    pub citation_pause_secs: u64,
    pub rate_limit_retries: u32,
    pub rate_limit_step_secs: u64,
    pub transport_retries: u32,
    pub transport_backoff_secs: u64,
}

// ─── Defaults ──────────────────────────────────────────────

pub const STATE_FILE_NAME: &str = ".paper_watcher_state.json";

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./papers"),
            pdf_directory: None,
            state_file: None,
            extensions: vec!["md".to_string()],
            debounce_secs: 2,
            poll_interval_ms: 1000,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            use_proxy: false,
            timeout_secs: 30,
            download_timeout_secs: 60,
            user_agent: concat!("citewatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            semantic_scholar: "https://api.semanticscholar.org/graph/v1".to_string(),
            arxiv_api: "https://export.arxiv.org/api/query".to_string(),
            arxiv_pdf: "https://arxiv.org/pdf".to_string(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            link_pause_secs: 2,
            citation_pause_secs: 1,
            rate_limit_retries: 3,
            rate_limit_step_secs: 3,
            transport_retries: 1,
            transport_backoff_secs: 2,
        }
    }
}

impl NetworkConfig {
    /// The proxy to route requests through, if one is enabled.
    pub fn active_proxy(&self) -> Option<&str> {
        if !self.use_proxy {
            return None;
        }
        self.proxy.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/citewatch/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CITEWATCH_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("citewatch")
            .join("config.toml")
    }

    /// Load config from `path`, falling back to defaults if the file doesn't
    /// exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no watcher could run with.
    pub fn validate(&self) -> Result<()> {
        if self.watch.extensions.iter().all(|ext| ext.trim().is_empty()) {
            return Err(CoreError::ConfigError(
                "watch.extensions must name at least one note extension".to_string(),
            ));
        }
        let endpoints = [
            ("endpoints.semantic_scholar", &self.endpoints.semantic_scholar),
            ("endpoints.arxiv_api", &self.endpoints.arxiv_api),
            ("endpoints.arxiv_pdf", &self.endpoints.arxiv_pdf),
        ];
        if let Some((key, _)) = endpoints.iter().find(|(_, url)| url.trim().is_empty()) {
            return Err(CoreError::ConfigError(format!("{key} must not be empty")));
        }
        Ok(())
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Where downloaded PDFs go: explicit setting or `<watch dir>/pdfs`.
    pub fn resolved_pdf_dir(&self) -> PathBuf {
        self.watch
            .pdf_directory
            .clone()
            .unwrap_or_else(|| self.watch.directory.join("pdfs"))
    }

    /// Path to the processed-link state document.
    pub fn resolved_state_file(&self) -> PathBuf {
        self.watch
            .state_file
            .clone()
            .unwrap_or_else(|| self.watch.directory.join(STATE_FILE_NAME))
    }
}
