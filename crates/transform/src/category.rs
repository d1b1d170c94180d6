//! Metric keys: which message type a result belongs to and which error
//! category a failure falls into.
use std::fmt;

use serde::Serialize;

/// Message families tracked separately in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Project,
    ProjectPhase,
    Job,
    /// Used when the topic could not be parsed, so the family is not known.
    Unknown,
}

impl MessageType {
    pub const COUNT: usize = 4;
    pub const ALL: [MessageType; Self::COUNT] = [
        MessageType::Project,
        MessageType::ProjectPhase,
        MessageType::Job,
        MessageType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Project => "project",
            MessageType::ProjectPhase => "project_phase",
            MessageType::Job => "job",
            MessageType::Unknown => "unknown",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error taxonomy shared by metrics, logging, and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    JsonParse,
    Validation,
    MissingField,
    InvalidStatus,
    InvalidPlatform,
    InvalidValue,
    OutputValidation,
    Transform,
    RateLimitExceeded,
    Unknown,
}

impl ErrorType {
    pub const COUNT: usize = 10;
    pub const ALL: [ErrorType; Self::COUNT] = [
        ErrorType::JsonParse,
        ErrorType::Validation,
        ErrorType::MissingField,
        ErrorType::InvalidStatus,
        ErrorType::InvalidPlatform,
        ErrorType::InvalidValue,
        ErrorType::OutputValidation,
        ErrorType::Transform,
        ErrorType::RateLimitExceeded,
        ErrorType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::JsonParse => "json_parse",
            ErrorType::Validation => "validation",
            ErrorType::MissingField => "missing_field",
            ErrorType::InvalidStatus => "invalid_status",
            ErrorType::InvalidPlatform => "invalid_platform",
            ErrorType::InvalidValue => "invalid_value",
            ErrorType::OutputValidation => "output_validation",
            ErrorType::Transform => "transform",
            ErrorType::RateLimitExceeded => "rate_limit_exceeded",
            ErrorType::Unknown => "unknown",
        }
    }

    /// Failures that point at a publisher or transformer bug rather than a
    /// single bad message.
    pub fn is_critical(&self) -> bool {
        matches!(self, ErrorType::JsonParse | ErrorType::OutputValidation)
    }

    /// Deterministic failures: the same input fails the same way every time.
    pub fn is_deterministic(&self) -> bool {
        matches!(
            self,
            ErrorType::JsonParse
                | ErrorType::MissingField
                | ErrorType::InvalidStatus
                | ErrorType::InvalidPlatform
                | ErrorType::InvalidValue
                | ErrorType::Validation
        )
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_match_all_order() {
        for (i, t) in MessageType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
        for (i, t) in ErrorType::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }
}
