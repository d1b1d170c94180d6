//! Progress Relay transform pipeline
//!
//! Turns untrusted upstream payloads into validated, client-safe notification
//! messages, counting every outcome along the way.
//!
//! ## What we do here
//!
//! - **Route** - [`MessageTransformer`] parses the topic and dispatches to the
//!   project or job transformer
//! - **Normalize** - percentages are clamped to `[0, 100]`, ETAs to `>= 0`, and
//!   duplicate content items are dropped (first occurrence wins)
//! - **Re-check** - every built message passes its own `validate()` before it
//!   leaves the pipeline
//! - **Count** - [`MetricsCollector`] keeps lock-free counters and a bounded
//!   latency window per message type
//! - **Classify** - [`ErrorHandler`] sorts failures into an [`ErrorType`],
//!   logs them by severity and decides whether a retry could help
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use transform::{MessageTransformer, MessageType, MetricsCollector, TransformConfig};
//!
//! let metrics = Arc::new(MetricsCollector::default());
//! let transformer = MessageTransformer::with_collector(metrics.clone(), &TransformConfig::default());
//!
//! let message = transformer
//!     .transform_message(
//!         "project:proj_123:user_456",
//!         br#"{"status":"PROCESSING","progress":{"current":1,"total":4,"percentage":250,"eta":-3}}"#,
//!     )
//!     .unwrap();
//! assert_eq!(message.message_type(), MessageType::Project);
//! assert!(message.to_json().unwrap().contains("\"percentage\":100.0"));
//! assert_eq!(metrics.success_count(MessageType::Project), 1);
//! ```

mod category;
mod config;
mod error;
mod error_handler;
mod job;
mod metrics;
mod normalize;
mod notification;
mod project;
mod transformer;

pub use crate::category::{ErrorType, MessageType};
pub use crate::config::{ConfigError, TransformConfig};
pub use crate::error::TransformError;
pub use crate::error_handler::{
    classify_error, classify_message, should_retry_transform, truncate_payload, ErrorContext,
    ErrorHandler, ErrorReporter,
};
pub use crate::job::{dedup_content, JobTransformer};
pub use crate::metrics::{MessageTypeSnapshot, MetricsCollector, MetricsSnapshot, TransformMetrics};
pub use crate::normalize::{clamp_eta, clamp_percentage, transform_phase_progress, transform_progress};
pub use crate::notification::NotificationMessage;
pub use crate::project::ProjectTransformer;
pub use crate::transformer::MessageTransformer;
