//! Project payload transformation (legacy and phase-based layouts).
use std::sync::Arc;
use std::time::Instant;

use messages::{
    MessageValidator, ProjectFormat, ProjectInputMessage, ProjectNotificationMessage,
    ProjectPhaseInputMessage, ProjectPhaseNotificationMessage, ProjectPhasePayload, Validate,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::category::{ErrorType, MessageType};
use crate::error::TransformError;
use crate::metrics::TransformMetrics;
use crate::normalize::{clamp_percentage, transform_phase_progress, transform_progress};
use crate::notification::NotificationMessage;

pub(crate) fn decode<T: DeserializeOwned>(
    message_type: MessageType,
    payload: &[u8],
) -> Result<T, TransformError> {
    serde_json::from_slice(payload).map_err(|err| TransformError::Parse {
        message_type,
        reason: err.to_string(),
    })
}

/// Converts validated project payloads into client notifications.
///
/// Holds only shared collaborators, so one instance serves any number of
/// concurrent callers.
pub struct ProjectTransformer {
    validator: Arc<dyn MessageValidator>,
    metrics: Arc<dyn TransformMetrics>,
}

impl ProjectTransformer {
    pub fn new(validator: Arc<dyn MessageValidator>, metrics: Arc<dyn TransformMetrics>) -> Self {
        Self { validator, metrics }
    }

    /// Validate, decode, normalize and re-check a raw project payload.
    ///
    /// The result is [`NotificationMessage::Project`] for legacy payloads and
    /// [`NotificationMessage::ProjectPhase`] for `{type, payload}` envelopes.
    pub fn transform(&self, payload: &[u8]) -> Result<NotificationMessage, TransformError> {
        let started = Instant::now();

        let format = self.validator.validate_project_input(payload).map_err(|err| {
            self.metrics
                .record_error(MessageType::Project, ErrorType::Validation);
            TransformError::from(err)
        })?;

        let (message_type, message) = match format {
            ProjectFormat::Legacy => {
                let input = self.decode(MessageType::Project, payload)?;
                let output = self.transform_legacy(input)?;
                (MessageType::Project, NotificationMessage::Project(output))
            }
            ProjectFormat::Phase => {
                let input = self.decode(MessageType::ProjectPhase, payload)?;
                let output = self.transform_phase(input)?;
                (
                    MessageType::ProjectPhase,
                    NotificationMessage::ProjectPhase(output),
                )
            }
        };

        let elapsed = started.elapsed();
        self.metrics.record_success(message_type, elapsed);
        debug!(
            message_type = message_type.as_str(),
            elapsed_micros = elapsed.as_micros() as u64,
            "project_transformed"
        );
        Ok(message)
    }

    /// Map a decoded legacy message and check the result.
    pub fn transform_legacy(
        &self,
        input: ProjectInputMessage,
    ) -> Result<ProjectNotificationMessage, TransformError> {
        let output = ProjectNotificationMessage {
            status: input.status,
            progress: input.progress.map(transform_progress),
        };
        self.check_output(MessageType::Project, &output)?;
        Ok(output)
    }

    /// Map a decoded phase-based message and check the result.
    pub fn transform_phase(
        &self,
        input: ProjectPhaseInputMessage,
    ) -> Result<ProjectPhaseNotificationMessage, TransformError> {
        let payload = input.payload;
        let output = ProjectPhaseNotificationMessage {
            message_type: input.message_type,
            payload: ProjectPhasePayload {
                project_id: payload.project_id,
                status: payload.status,
                crawl: payload
                    .crawl
                    .map(|p| transform_phase_progress("payload.crawl.progress_percent", p)),
                analyze: payload
                    .analyze
                    .map(|p| transform_phase_progress("payload.analyze.progress_percent", p)),
                overall_progress_percent: clamp_percentage(
                    "payload.overall_progress_percent",
                    payload.overall_progress_percent,
                ),
            },
        };
        self.check_output(MessageType::ProjectPhase, &output)?;
        Ok(output)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        message_type: MessageType,
        payload: &[u8],
    ) -> Result<T, TransformError> {
        decode(message_type, payload).inspect_err(|_| {
            self.metrics.record_error(message_type, ErrorType::JsonParse);
        })
    }

    fn check_output(
        &self,
        message_type: MessageType,
        output: &impl Validate,
    ) -> Result<(), TransformError> {
        output.validate().map_err(|source| {
            self.metrics
                .record_error(message_type, ErrorType::OutputValidation);
            TransformError::OutputValidation {
                message_type,
                source,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use messages::{PhaseMessageType, PhaseStatus, ProjectStatus, SchemaValidator};

    use super::*;
    use crate::metrics::MetricsCollector;

    fn transformer() -> (ProjectTransformer, Arc<MetricsCollector>) {
        let metrics = Arc::new(MetricsCollector::default());
        let transformer = ProjectTransformer::new(Arc::new(SchemaValidator::new()), metrics.clone());
        (transformer, metrics)
    }

    #[test]
    fn legacy_payload_is_clamped() {
        let (transformer, metrics) = transformer();
        let payload = br#"{"status":"CRAWLING","progress":{"current":5,"total":4,"percentage":125.0,"eta":-9.5}}"#;

        let NotificationMessage::Project(message) = transformer.transform(payload).unwrap() else {
            panic!("expected legacy project message");
        };
        assert_eq!(message.status, Some(ProjectStatus::Crawling));
        let progress = message.progress.unwrap();
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(progress.eta, 0.0);
        assert!(progress.errors.is_empty());
        assert_eq!(metrics.success_count(MessageType::Project), 1);
    }

    #[test]
    fn phase_payload_clamps_each_sub_progress() {
        let (transformer, metrics) = transformer();
        let payload = br#"{
            "type": "project_progress",
            "payload": {
                "project_id": "proj_1",
                "status": "PROCESSING",
                "crawl": {"total": 100, "done": 100, "errors": 2, "progress_percent": 101.0},
                "analyze": {"total": 100, "done": 10, "errors": 0, "progress_percent": -4.0},
                "overall_progress_percent": 55.5
            }
        }"#;

        let NotificationMessage::ProjectPhase(message) = transformer.transform(payload).unwrap()
        else {
            panic!("expected phase message");
        };
        assert_eq!(message.message_type, PhaseMessageType::ProjectProgress);
        assert_eq!(message.payload.status, PhaseStatus::Processing);
        assert_eq!(message.payload.crawl.unwrap().progress_percent, 100.0);
        assert_eq!(message.payload.analyze.unwrap().progress_percent, 0.0);
        assert_eq!(message.payload.overall_progress_percent, 55.5);
        assert_eq!(metrics.success_count(MessageType::ProjectPhase), 1);
        assert_eq!(metrics.success_count(MessageType::Project), 0);
    }

    #[test]
    fn malformed_json_fails_input_validation() {
        let (transformer, metrics) = transformer();
        let err = transformer.transform(b"{\"status\":").unwrap_err();
        assert!(err.to_string().contains("invalid JSON format"));
        assert_eq!(metrics.error_count(MessageType::Project, ErrorType::Validation), 1);
        assert_eq!(metrics.error_count(MessageType::Project, ErrorType::JsonParse), 0);
        assert_eq!(metrics.success_count(MessageType::Project), 0);
    }

    #[test]
    fn null_progress_fields_decode_as_defaults() {
        let (transformer, metrics) = transformer();
        let payload = br#"{"status":"PROCESSING","progress":{"current":null,"percentage":null,"eta":null,"errors":null}}"#;

        let NotificationMessage::Project(message) = transformer.transform(payload).unwrap() else {
            panic!("expected legacy message");
        };
        let progress = message.progress.unwrap();
        assert_eq!(progress.current, 0);
        assert_eq!(progress.percentage, 0.0);
        assert_eq!(progress.eta, 0.0);
        assert_eq!(metrics.success_count(MessageType::Project), 1);
        assert_eq!(metrics.total_errors(MessageType::Project), 0);
    }

    #[test]
    fn schema_violation_is_counted_as_validation() {
        let (transformer, metrics) = transformer();
        let err = transformer
            .transform(br#"{"status":"EXPLODED"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("project input validation failed"));
        assert_eq!(metrics.error_count(MessageType::Project, ErrorType::Validation), 1);
    }

    #[test]
    fn empty_project_id_fails_validation() {
        let (transformer, _) = transformer();
        let payload = br#"{"type":"project_completed","payload":{"project_id":"","status":"DONE","overall_progress_percent":100}}"#;
        assert!(transformer.transform(payload).is_err());
    }

    #[test]
    fn output_check_rejects_what_mapping_cannot_fix() {
        let (transformer, metrics) = transformer();
        let input = ProjectPhaseInputMessage {
            message_type: PhaseMessageType::ProjectCompleted,
            payload: messages::ProjectPhasePayloadInput {
                project_id: String::new(),
                status: PhaseStatus::Done,
                crawl: None,
                analyze: None,
                overall_progress_percent: 100.0,
            },
        };
        let err = transformer.transform_phase(input).unwrap_err();
        assert!(matches!(err, TransformError::OutputValidation { .. }));
        assert_eq!(
            metrics.error_count(MessageType::ProjectPhase, ErrorType::OutputValidation),
            1
        );
    }
}
