//! Application configuration

use std::path::Path;
use std::time::Duration;

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub pin_auth: PinAuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Limits for the PIN pairing session manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinAuthConfig {
    /// Polls allowed before a session is force-deleted
    pub max_attempts: u32,
    /// Absolute session lifetime
    pub session_ttl_seconds: u64,
    /// Background sweep cadence
    pub sweep_interval_seconds: u64,
    /// Overridable for tests; production always talks to plex.tv
    pub plex_base_url: String,
}

impl Default for PinAuthConfig {
    fn default() -> Self {
        Self {
            max_attempts: 300,
            session_ttl_seconds: 600,
            sweep_interval_seconds: 60,
            plex_base_url: "https://plex.tv".to_string(),
        }
    }
}

impl PinAuthConfig {
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl Config {
    /// Load configuration from an optional file, then override with
    /// environment variables (`MEDIARR_LOGGING_LEVEL`, etc.).
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("MEDIARR")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }
}
