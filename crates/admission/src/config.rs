//! Admission quotas and rate-limit window.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Limits enforced by [`ConnectionTracker`](crate::ConnectionTracker).
///
/// ```rust
/// use admission::AdmissionConfig;
///
/// let config = AdmissionConfig::default();
/// assert_eq!(config.max_connections_per_user, 10);
/// assert_eq!(config.rate_limit_window().as_secs(), 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Open connections allowed per user across all resources.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: u32,

    #[serde(default = "default_max_per_resource")]
    pub max_connections_per_user_per_project: u32,

    #[serde(default = "default_max_per_resource")]
    pub max_connections_per_user_per_job: u32,

    /// New connections allowed per user inside one rate-limit window.
    #[serde(default = "default_connection_rate_limit")]
    pub connection_rate_limit: u32,

    #[serde(default = "default_window_secs")]
    pub rate_limit_window_secs: u64,

    /// How often the background sweeper drops expired timestamps.
    #[serde(default = "default_window_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            max_connections_per_user_per_project: default_max_per_resource(),
            max_connections_per_user_per_job: default_max_per_resource(),
            connection_rate_limit: default_connection_rate_limit(),
            rate_limit_window_secs: default_window_secs(),
            sweep_interval_secs: default_window_secs(),
        }
    }
}

impl AdmissionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("max_connections_per_user", self.max_connections_per_user as u64),
            (
                "max_connections_per_user_per_project",
                self.max_connections_per_user_per_project as u64,
            ),
            (
                "max_connections_per_user_per_job",
                self.max_connections_per_user_per_job as u64,
            ),
            ("connection_rate_limit", self.connection_rate_limit as u64),
            ("rate_limit_window_secs", self.rate_limit_window_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
        ];
        match checks.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::Invalid(format!("{name} must be > 0"))),
            None => Ok(()),
        }
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_max_connections_per_user() -> u32 {
    10
}

fn default_max_per_resource() -> u32 {
    3
}

fn default_connection_rate_limit() -> u32 {
    20
}

fn default_window_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let cfg = AdmissionConfig::default();
        assert_eq!(cfg.max_connections_per_user, 10);
        assert_eq!(cfg.max_connections_per_user_per_project, 3);
        assert_eq!(cfg.max_connections_per_user_per_job, 3);
        assert_eq!(cfg.connection_rate_limit, 20);
        assert_eq!(cfg.rate_limit_window(), Duration::from_secs(60));
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(60));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_limits_are_rejected() {
        let cfg = AdmissionConfig {
            connection_rate_limit: 0,
            ..AdmissionConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("connection_rate_limit"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: AdmissionConfig =
            serde_json::from_str(r#"{"max_connections_per_user": 2}"#).unwrap();
        assert_eq!(cfg.max_connections_per_user, 2);
        assert_eq!(cfg.connection_rate_limit, 20);
    }
}
