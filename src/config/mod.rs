//! Configuration module for VisFlow
//!
//! Engine settings are stored as TOML in the platform-appropriate data
//! directory:
//! - **Linux**: `~/.local/share/visflow/config.toml`
//! - **macOS**: `~/Library/Application Support/visflow/config.toml`
//! - **Windows**: `%APPDATA%\visflow\config.toml`
//!
//! Every field has a default, so a partial file is valid.
//!
//! ```toml
//! username = "alice"
//! data_dir = "/srv/visflow/data"
//!
//! [logging]
//! filter = "visflow=debug"
//! log_dir = "/var/log/visflow"
//!
//! [propagation]
//! fetch_timeout_ms = 5000
//! ```

use crate::error::{Result, VisFlowError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "visflow";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default time allowed for one dataset fetch
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "visflow=info";

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Write a daily rolling log file here as well as to stderr
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    pub fetch_timeout_ms: u64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Owner used by data sources that don't name one
    pub username: String,
    /// Root directory for the directory fetcher
    pub data_dir: PathBuf,
    pub logging: LoggingConfig,
    pub propagation: PropagationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            username: "default".to_string(),
            data_dir: app_data_dir()
                .map(|p| p.join("data"))
                .unwrap_or_else(|| PathBuf::from("data")),
            logging: LoggingConfig::default(),
            propagation: PropagationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Path of the config file in the app data directory
    pub fn default_path() -> Option<PathBuf> {
        app_data_dir().map(|p| p.join(CONFIG_FILE))
    }

    /// Load configuration from a file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            VisFlowError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            VisFlowError::Config(format!("Failed to parse config {:?}: {}", path, e))
        })
    }

    /// Load from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                VisFlowError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .map_err(|e| VisFlowError::Config(format!("Failed to write config: {}", e)))
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.propagation.fetch_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            username = "alice"

            [propagation]
            fetch_timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.username, "alice");
        assert_eq!(config.propagation.fetch_timeout_ms, 250);
        assert_eq!(config.logging.filter, DEFAULT_LOG_FILTER);
        assert!(config.logging.log_dir.is_none());
    }

    #[test]
    fn test_default_timeout() {
        let config = EngineConfig::default();
        assert_eq!(config.fetch_timeout().as_millis(), 10_000);
    }
}
