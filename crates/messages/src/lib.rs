//! Progress Relay message model
//!
//! Everything a relay needs to know about the shape of progress notifications
//! lives here: the upstream input schemas, the client-facing output messages,
//! topic strings, and the validators that guard both sides.
//!
//! ## What we do here
//!
//! - **Model messages** - legacy project, phase-based project, and job payloads
//!   in, typed notification messages out
//! - **Validate raw input** - [`SchemaValidator`] checks JSON against the schema
//!   without touching it, and tags project payloads as legacy or phase-based
//! - **Validate output** - every notification type implements [`Validate`]
//! - **Parse topics** - [`validate_topic_format`] turns
//!   `"<type>:<resource_id>:<user_id>"` into a [`Topic`]
//!
//! ## Example
//!
//! ```
//! use messages::{MessageValidator, ProjectFormat, SchemaValidator};
//!
//! let validator = SchemaValidator::new();
//! let payload = br#"{"status":"PROCESSING","progress":{"current":3,"total":10,"percentage":30.0}}"#;
//! assert_eq!(validator.validate_project_input(payload).unwrap(), ProjectFormat::Legacy);
//!
//! let err = validator.validate_job_input(br#"{"platform":"FACEBOOK"}"#).unwrap_err();
//! assert!(err.to_string().contains("invalid platform"));
//! ```

mod error;
mod topic;
mod types;
mod validate;
mod validator;

pub use crate::error::ValidationError;
pub use crate::topic::{validate_id, validate_topic_format, Topic, TopicType, MAX_ID_LEN};
pub use crate::types::{
    Author, AuthorInput, BatchData, BatchInput, ContentInput, ContentItem, ContentMetrics,
    JobInputMessage, JobNotificationMessage, JobStatus, Media, MediaInput, MetricsInput,
    PhaseMessageType, PhaseProgress, PhaseProgressInput, PhaseStatus, Platform, Progress,
    ProgressInput, ProjectInputMessage, ProjectNotificationMessage, ProjectPhaseInputMessage,
    ProjectPhaseNotificationMessage, ProjectPhasePayload, ProjectPhasePayloadInput, ProjectStatus,
};
pub use crate::validate::Validate;
pub use crate::validator::{MessageValidator, ProjectFormat, SchemaValidator};
