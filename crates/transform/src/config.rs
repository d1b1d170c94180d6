//! Configuration for the transform pipeline.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors surfaced by [`TransformConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid transform configuration: {0}")]
    Invalid(String),
}

/// Runtime knobs for metrics retention and error logging.
///
/// ```rust
/// use transform::TransformConfig;
///
/// let config = TransformConfig::default();
/// assert_eq!(config.latency_sample_capacity, 1000);
/// assert_eq!(config.max_logged_payload_chars, 200);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Latency samples retained per message type. Oldest samples are evicted
    /// first once the buffer is full.
    #[serde(default = "default_latency_sample_capacity")]
    pub latency_sample_capacity: usize,

    /// Payloads longer than this are truncated before they reach the logs.
    #[serde(default = "default_max_logged_payload_chars")]
    pub max_logged_payload_chars: usize,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            latency_sample_capacity: default_latency_sample_capacity(),
            max_logged_payload_chars: default_max_logged_payload_chars(),
        }
    }
}

impl TransformConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.latency_sample_capacity == 0 {
            return Err(ConfigError::Invalid(
                "latency_sample_capacity must be > 0".into(),
            ));
        }
        // head + marker + tail needs some room to be legible
        if self.max_logged_payload_chars < 32 {
            return Err(ConfigError::Invalid(
                "max_logged_payload_chars must be >= 32".into(),
            ));
        }
        Ok(())
    }
}

fn default_latency_sample_capacity() -> usize {
    1000
}

fn default_max_logged_payload_chars() -> usize {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        let cfg = TransformConfig {
            latency_sample_capacity: 0,
            ..TransformConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let cfg: TransformConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, TransformConfig::default());
    }
}
