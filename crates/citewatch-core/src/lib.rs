pub mod config;
pub mod error;
pub mod state;
pub mod sync;

pub use config::{AppConfig, EndpointConfig, NetworkConfig, ThrottleConfig, WatchConfig};
pub use error::{CoreError, Result};
pub use state::{PersistedState, ProcessedEntry, ProcessedInfo, ProcessedStateStore};
