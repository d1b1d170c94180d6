//! Error types produced by message validation.
//!
//! Every check in this crate reports through [`ValidationError`]. The rendered
//! messages are stable and lower-level callers (the transform error handler in
//! particular) classify failures by matching on them, so treat the `#[error]`
//! strings as part of the public contract.
//!
//! # Error Categories
//!
//! | Error | Rendered prefix |
//! |-------|-----------------|
//! | [`InvalidJson`](ValidationError::InvalidJson) | `invalid JSON format` |
//! | [`MissingField`](ValidationError::MissingField) | `missing required field` |
//! | [`InvalidStatus`](ValidationError::InvalidStatus) | `invalid status` |
//! | [`InvalidPlatform`](ValidationError::InvalidPlatform) | `invalid platform` |
//! | [`InvalidValue`](ValidationError::InvalidValue) | `invalid value for <field>` |
//! | [`InvalidTopicFormat`](ValidationError::InvalidTopicFormat) | `invalid topic format` |
//! | [`InvalidTopicType`](ValidationError::InvalidTopicType) | `invalid topic type` |
//! | [`InvalidId`](ValidationError::InvalidId) | `invalid <segment>` |
//! | [`Layer`](ValidationError::Layer) | `<layer> validation failed: <inner>` |
//!
//! # Examples
//!
//! ```rust
//! use messages::ValidationError;
//!
//! let err = ValidationError::MissingField("platform".into()).in_layer("job input");
//! assert_eq!(
//!     err.to_string(),
//!     "job input validation failed: missing required field: platform"
//! );
//! assert!(matches!(err.root(), ValidationError::MissingField(_)));
//! ```
use thiserror::Error;

/// Errors raised while checking raw payloads, topics, or constructed messages.
///
/// The enum is `#[non_exhaustive]`; match with a catch-all arm.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    /// The payload is not parseable JSON.
    #[error("invalid JSON format: {0}")]
    InvalidJson(String),

    /// A field the schema requires is absent or null.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A status string outside the accepted enumeration.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// A platform string outside the accepted enumeration.
    #[error("invalid platform: {0}")]
    InvalidPlatform(String),

    /// A field is present but has the wrong type or an unacceptable value.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// Topic did not split into exactly three `:`-separated segments.
    #[error("invalid topic format: {0}")]
    InvalidTopicFormat(String),

    /// Topic type segment is neither `project` nor `job`.
    #[error("invalid topic type: {0}")]
    InvalidTopicType(String),

    /// A resource or user identifier broke the ID format rule.
    #[error("invalid {segment}: {reason}")]
    InvalidId {
        segment: &'static str,
        reason: String,
    },

    /// An inner failure annotated with the validation layer that caught it.
    #[error("{layer} validation failed: {source}")]
    Layer {
        layer: &'static str,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap this error with the name of the layer that rejected the input.
    pub fn in_layer(self, layer: &'static str) -> Self {
        ValidationError::Layer {
            layer,
            source: Box::new(self),
        }
    }

    /// The innermost error, with every [`Layer`](ValidationError::Layer) peeled off.
    pub fn root(&self) -> &ValidationError {
        let mut current = self;
        while let ValidationError::Layer { source, .. } = current {
            current = source;
        }
        current
    }

    /// True when the innermost cause is unparseable JSON.
    pub fn is_json_error(&self) -> bool {
        matches!(self.root(), ValidationError::InvalidJson(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layered_errors_render_outermost_first() {
        let err = ValidationError::InvalidJson("EOF while parsing".into())
            .in_layer("legacy project")
            .in_layer("project input");
        assert_eq!(
            err.to_string(),
            "project input validation failed: legacy project validation failed: invalid JSON format: EOF while parsing"
        );
        assert!(err.is_json_error());
    }

    #[test]
    fn root_of_unwrapped_error_is_itself() {
        let err = ValidationError::InvalidStatus("RUNNING".into());
        assert_eq!(err.root(), &err);
        assert!(!err.is_json_error());
    }
}
