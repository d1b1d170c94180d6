use messages::{
    JobNotificationMessage, ProjectNotificationMessage, ProjectPhaseNotificationMessage,
    Validate, ValidationError,
};
use serde::Serialize;

use crate::category::MessageType;
use crate::error::TransformError;

/// Any message the relay can deliver to a websocket client.
///
/// Serializes as the inner message with no wrapper, which is exactly what
/// clients receive on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NotificationMessage {
    Project(ProjectNotificationMessage),
    ProjectPhase(ProjectPhaseNotificationMessage),
    Job(JobNotificationMessage),
}

impl NotificationMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            NotificationMessage::Project(_) => MessageType::Project,
            NotificationMessage::ProjectPhase(_) => MessageType::ProjectPhase,
            NotificationMessage::Job(_) => MessageType::Job,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            NotificationMessage::Project(message) => message.validate(),
            NotificationMessage::ProjectPhase(message) => message.validate(),
            NotificationMessage::Job(message) => message.validate(),
        }
    }

    /// Render the client-facing JSON text.
    pub fn to_json(&self) -> Result<String, TransformError> {
        serde_json::to_string(self).map_err(|err| TransformError::Transform {
            message_type: self.message_type(),
            reason: format!("cannot serialize notification: {err}"),
        })
    }
}

impl From<ProjectNotificationMessage> for NotificationMessage {
    fn from(message: ProjectNotificationMessage) -> Self {
        NotificationMessage::Project(message)
    }
}

impl From<ProjectPhaseNotificationMessage> for NotificationMessage {
    fn from(message: ProjectPhaseNotificationMessage) -> Self {
        NotificationMessage::ProjectPhase(message)
    }
}

impl From<JobNotificationMessage> for NotificationMessage {
    fn from(message: JobNotificationMessage) -> Self {
        NotificationMessage::Job(message)
    }
}
