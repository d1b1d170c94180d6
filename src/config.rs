//! YAML configuration for the relay core.
//!
//! One file carries the admission limits and the transform knobs so a
//! deployment can tune both without rebuilding.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "production"
//!
//! admission:
//!   max_connections_per_user: 10
//!   max_connections_per_user_per_project: 3
//!   max_connections_per_user_per_job: 3
//!   connection_rate_limit: 20
//!   rate_limit_window_secs: 60
//!   sweep_interval_secs: 60
//!
//! transform:
//!   latency_sample_capacity: 1000
//!   max_logged_payload_chars: 200
//! ```

use std::fs;
use std::path::Path;

use admission::AdmissionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use transform::TransformConfig;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

impl From<admission::ConfigError> for ConfigLoadError {
    fn from(err: admission::ConfigError) -> Self {
        ConfigLoadError::Validation(err.to_string())
    }
}

impl From<transform::ConfigError> for ConfigLoadError {
    fn from(err: transform::ConfigError) -> Self {
        ConfigLoadError::Validation(err.to_string())
    }
}

/// Top-level relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RelayConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub admission: AdmissionConfig,

    #[serde(default)]
    pub transform: TransformConfig,
}

impl RelayConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: RelayConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        self.admission.validate()?;
        self.transform.validate()?;
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            admission: AdmissionConfig::default(),
            transform: TransformConfig::default(),
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
