//! Workspace umbrella crate for Progress Relay.
//!
//! Progress Relay sits between a backend publisher and websocket clients. It
//! admits or refuses connections against per-user quotas, and turns untrusted
//! upstream progress payloads into validated client notifications.
//!
//! This crate re-exports the stage crates and adds [`Relay`], a bundle of a
//! [`ConnectionTracker`] and a [`MessageTransformer`] sharing one
//! [`RelayConfig`].
//!
//! ```
//! use progress_relay::{Relay, RelayConfig};
//!
//! let relay = Relay::new(&RelayConfig::default());
//! relay.admit("user_456", Some("proj_123"), None).unwrap();
//!
//! let (topic, message) = relay
//!     .transform("project:proj_123:user_456", br#"{"status":"COMPLETED"}"#)
//!     .unwrap();
//! assert_eq!(topic.resource_id, "proj_123");
//! assert!(message.validate().is_ok());
//!
//! relay.release("user_456", Some("proj_123"), None);
//! ```

pub mod config;

pub use admission::{
    is_rate_limit_error, spawn_sweeper, AdmissionConfig, AdmissionStats, Clock,
    ConnectionTracker, LimitKind, ManualClock, RateLimitError, SweeperHandle, SystemClock,
};
pub use config::{ConfigLoadError, RelayConfig};
pub use messages::{
    validate_topic_format, JobNotificationMessage, MessageValidator, ProjectFormat,
    ProjectNotificationMessage, ProjectPhaseNotificationMessage, SchemaValidator, Topic,
    TopicType, Validate, ValidationError,
};
pub use transform::{
    classify_error, should_retry_transform, ErrorHandler, ErrorType, MessageTransformer,
    MessageType, MetricsCollector, MetricsSnapshot, NotificationMessage, TransformConfig,
    TransformError, TransformMetrics,
};

use std::sync::Arc;

/// Admission and transformation wired from one configuration.
pub struct Relay {
    tracker: Arc<ConnectionTracker>,
    transformer: MessageTransformer,
    metrics: Arc<MetricsCollector>,
}

impl Relay {
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build with a custom admission clock (tests drive a [`ManualClock`]).
    pub fn with_clock(config: &RelayConfig, clock: Arc<dyn Clock>) -> Self {
        let tracker = Arc::new(ConnectionTracker::with_clock(
            config.admission.clone(),
            clock,
        ));
        let metrics = Arc::new(MetricsCollector::new(
            config.transform.latency_sample_capacity,
        ));
        let transformer = MessageTransformer::with_collector(metrics.clone(), &config.transform);
        Self {
            tracker,
            transformer,
            metrics,
        }
    }

    pub fn tracker(&self) -> &Arc<ConnectionTracker> {
        &self.tracker
    }

    pub fn transformer(&self) -> &MessageTransformer {
        &self.transformer
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn admit(
        &self,
        user_id: &str,
        project_id: Option<&str>,
        job_id: Option<&str>,
    ) -> Result<(), RateLimitError> {
        self.tracker
            .check_and_track_connection(user_id, project_id, job_id)
    }

    pub fn release(&self, user_id: &str, project_id: Option<&str>, job_id: Option<&str>) {
        self.tracker.untrack_connection(user_id, project_id, job_id);
    }

    /// Transform a pub/sub message and return the topic it belongs to.
    pub fn transform(
        &self,
        channel: &str,
        payload: &[u8],
    ) -> Result<(Topic, NotificationMessage), TransformError> {
        self.transformer.transform_for_topic(channel, payload)
    }

    /// Start the periodic rate-window sweep on the current tokio runtime.
    pub fn start_sweeper(&self) -> SweeperHandle {
        spawn_sweeper(
            Arc::clone(&self.tracker),
            self.tracker.config().sweep_interval(),
        )
    }
}
