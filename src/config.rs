//! Configuration file format.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration. Values are validated once at load time.

use crate::entropy::DEFAULT_QRNG_ENDPOINT;
use crate::selection::{ControllerConfig, EligibleTriggerSet, TriggerError, DEFAULT_TRIGGERS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid trigger set: {0}")]
    InvalidTriggers(#[from] TriggerError),
    #[error("remote timeout must be greater than zero")]
    InvalidTimeout,
    #[error("invalid remote endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// First-layer roll configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Roll values in 1..=100 that permit a remote fetch.
    pub triggers: Vec<u8>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            triggers: DEFAULT_TRIGGERS.to_vec(),
        }
    }
}

/// Remote randomness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// QRNG endpoint returning `{"data":[n]}`.
    pub endpoint: String,
    /// Timeout for the single fetch attempt, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_QRNG_ENDPOINT.to_string(),
            timeout_ms: 3000,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Simulator output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Run until interrupted (true) or for a fixed number of cycles.
    pub continuous: bool,
    /// Number of lock/unlock cycles if not continuous.
    pub cycles: u32,
    /// Pause between simulated events, in milliseconds.
    pub interval_ms: u64,
    /// Where the selected wallpaper is written.
    pub wallpaper_path: PathBuf,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            cycles: 10,
            interval_ms: 250,
            wallpaper_path: PathBuf::from("wallpaper.png"),
            metrics_port: 0,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        EligibleTriggerSet::new(self.selection.triggers.iter().copied())?;

        if self.remote.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let endpoint = self.remote.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(self.remote.endpoint.clone()));
        }

        Ok(())
    }

    /// Builds the controller settings.
    pub fn controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        Ok(ControllerConfig {
            triggers: EligibleTriggerSet::new(self.selection.triggers.iter().copied())?,
            fetch_timeout: self.remote.timeout(),
        })
    }
}
