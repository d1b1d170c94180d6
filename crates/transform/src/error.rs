use messages::ValidationError;
use thiserror::Error;

use crate::category::MessageType;

/// Errors surfaced by the transform pipeline.
///
/// `OutputValidation` deliberately renders without its cause: the error
/// handler classifies on the rendered message and the inner detail
/// (`invalid value for ...`) would otherwise shadow the output category.
/// The cause stays reachable through [`std::error::Error::source`].
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TransformError {
    /// The channel did not parse as a topic.
    #[error("topic validation failed: {0}")]
    Topic(#[source] ValidationError),

    /// The raw payload failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The payload passed validation but did not decode into its typed form.
    #[error("invalid JSON format: cannot decode {message_type} message: {reason}")]
    Parse {
        message_type: MessageType,
        reason: String,
    },

    /// The transformer built a message that failed its own checks.
    #[error("output validation failed for {message_type} message")]
    OutputValidation {
        message_type: MessageType,
        #[source]
        source: ValidationError,
    },

    #[error("transform failed for {message_type} message: {reason}")]
    Transform {
        message_type: MessageType,
        reason: String,
    },
}

impl TransformError {
    /// The message family this error is attributed to, when the error knows it.
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            TransformError::Topic(_) => Some(MessageType::Unknown),
            TransformError::Validation(_) => None,
            TransformError::Parse { message_type, .. }
            | TransformError::OutputValidation { message_type, .. }
            | TransformError::Transform { message_type, .. } => Some(*message_type),
        }
    }
}
