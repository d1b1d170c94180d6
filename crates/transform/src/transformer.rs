//! The transform façade: topic in, notification out.
use std::sync::Arc;

use messages::{MessageValidator, SchemaValidator, Topic, TopicType};

use crate::category::{ErrorType, MessageType};
use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::error_handler::{ErrorContext, ErrorHandler, ErrorReporter};
use crate::job::JobTransformer;
use crate::metrics::{MetricsCollector, TransformMetrics};
use crate::notification::NotificationMessage;
use crate::project::ProjectTransformer;

/// Routes `(channel, payload)` pairs to the matching transformer and reports
/// every failure through an [`ErrorReporter`].
///
/// All collaborators are injected as capabilities, so tests can swap in
/// recording validators, metrics sinks, or reporters.
pub struct MessageTransformer {
    validator: Arc<dyn MessageValidator>,
    metrics: Arc<dyn TransformMetrics>,
    errors: Arc<dyn ErrorReporter>,
    project: ProjectTransformer,
    job: JobTransformer,
}

impl MessageTransformer {
    pub fn new(
        validator: Arc<dyn MessageValidator>,
        metrics: Arc<dyn TransformMetrics>,
        errors: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            project: ProjectTransformer::new(validator.clone(), metrics.clone()),
            job: JobTransformer::new(validator.clone(), metrics.clone()),
            validator,
            metrics,
            errors,
        }
    }

    /// Default wiring: schema validator, `collector` for metrics and a
    /// tracing-backed [`ErrorHandler`].
    pub fn with_collector(collector: Arc<MetricsCollector>, config: &TransformConfig) -> Self {
        let metrics: Arc<dyn TransformMetrics> = collector;
        let errors = ErrorHandler::new(metrics.clone(), config.max_logged_payload_chars);
        Self::new(
            Arc::new(SchemaValidator::new()),
            metrics,
            Arc::new(errors),
        )
    }

    /// Validate `channel` as a topic and transform `payload` for it.
    pub fn transform_message(
        &self,
        channel: &str,
        payload: &[u8],
    ) -> Result<NotificationMessage, TransformError> {
        self.transform_for_topic(channel, payload)
            .map(|(_, message)| message)
    }

    /// Like [`transform_message`](Self::transform_message) but also returns
    /// the parsed topic, which fan-out needs to pick subscribers.
    pub fn transform_for_topic(
        &self,
        channel: &str,
        payload: &[u8],
    ) -> Result<(Topic, NotificationMessage), TransformError> {
        let topic = match self.validator.validate_topic_format(channel) {
            Ok(topic) => topic,
            Err(source) => {
                let err = TransformError::Topic(source);
                self.metrics
                    .record_error(MessageType::Unknown, ErrorType::Validation);
                self.report(&err, MessageType::Unknown, Some(channel), payload);
                return Err(err);
            }
        };

        let canonical = topic.to_string();
        let result = match topic.topic_type {
            TopicType::Project => self.project.transform(payload),
            TopicType::Job => self.job.transform(payload).map(NotificationMessage::Job),
        };
        match result {
            Ok(message) => Ok((topic, message)),
            Err(err) => {
                let message_type = err.message_type().unwrap_or(match topic.topic_type {
                    TopicType::Project => MessageType::Project,
                    TopicType::Job => MessageType::Job,
                });
                self.report(&err, message_type, Some(&canonical), payload);
                Err(err)
            }
        }
    }

    /// Transform a project payload with no topic attached.
    pub fn transform_project_message(
        &self,
        payload: &[u8],
    ) -> Result<NotificationMessage, TransformError> {
        self.project.transform(payload).inspect_err(|err| {
            let message_type = err.message_type().unwrap_or(MessageType::Project);
            self.report(err, message_type, None, payload);
        })
    }

    /// Transform a job payload with no topic attached.
    pub fn transform_job_message(
        &self,
        payload: &[u8],
    ) -> Result<NotificationMessage, TransformError> {
        self.job
            .transform(payload)
            .map(NotificationMessage::Job)
            .inspect_err(|err| {
                self.report(err, MessageType::Job, None, payload);
            })
    }

    fn report(
        &self,
        err: &TransformError,
        message_type: MessageType,
        channel: Option<&str>,
        payload: &[u8],
    ) -> ErrorType {
        let ctx = ErrorContext {
            message_type,
            channel,
            payload,
        };
        self.errors.handle_error(err, &ctx)
    }
}
