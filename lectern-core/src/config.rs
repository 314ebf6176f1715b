use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub session: SessionConfig,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cadence of the speaker-side audience analysis aggregation
    pub analysis_interval_secs: u64,
    /// Upper bound on a relay join attempt before it is reported failed
    pub relay_join_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            analysis_interval_secs: 5,
            relay_join_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from the default sources: an optional
    /// `lectern.toml` in the working directory, overlaid with
    /// `LECTERN_`-prefixed environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .add_source(File::with_name("lectern").required(false))
            .add_source(Environment::with_prefix("LECTERN").separator("__"))
            .build()?;
        builder.try_deserialize()
    }

    /// Load configuration from a specific file, overlaid with
    /// `LECTERN_`-prefixed environment variables.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let builder = ConfigBuilder::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("LECTERN").separator("__"))
            .build()?;
        builder.try_deserialize()
    }
}
