//! Topic strings: `<type>:<resource_id>:<user_id>`.
//!
//! A topic names what a message is about (a project or a job), which resource
//! it refers to, and which user owns it. The relay routes on the rendered
//! string, so [`Topic`]'s `Display` always reproduces the canonical form.
use std::fmt;

use crate::error::ValidationError;

/// Maximum length of a resource or user identifier.
pub const MAX_ID_LEN: usize = 50;

/// What kind of resource a topic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicType {
    Project,
    Job,
}

impl TopicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicType::Project => "project",
            TopicType::Job => "job",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "project" => Some(TopicType::Project),
            "job" => Some(TopicType::Job),
            _ => None,
        }
    }
}

impl fmt::Display for TopicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed, validated topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    pub topic_type: TopicType,
    pub resource_id: String,
    pub user_id: String,
}

impl Topic {
    /// Build a topic from parts, applying the same ID checks as parsing.
    pub fn new(
        topic_type: TopicType,
        resource_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let resource_id = resource_id.into();
        let user_id = user_id.into();
        validate_id("resource ID", &resource_id)?;
        validate_id("user ID", &user_id)?;
        Ok(Self {
            topic_type,
            resource_id,
            user_id,
        })
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.topic_type, self.resource_id, self.user_id
        )
    }
}

/// Check an identifier against `^[A-Za-z0-9_-]{1,50}$`.
///
/// `segment` names the identifier in the error (`"resource ID"`, `"user ID"`).
pub fn validate_id(segment: &'static str, id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::InvalidId {
            segment,
            reason: "must not be empty".into(),
        });
    }
    if id.len() > MAX_ID_LEN {
        return Err(ValidationError::InvalidId {
            segment,
            reason: format!("length {} exceeds {MAX_ID_LEN} characters", id.len()),
        });
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(ValidationError::InvalidId {
            segment,
            reason: format!("contains invalid character {bad:?}"),
        });
    }
    Ok(())
}

/// Parse and validate a topic string.
///
/// ```rust
/// use messages::{validate_topic_format, TopicType};
///
/// let topic = validate_topic_format("project:proj_123:user_456").unwrap();
/// assert_eq!(topic.topic_type, TopicType::Project);
/// assert_eq!(topic.resource_id, "proj_123");
/// assert_eq!(topic.user_id, "user_456");
/// assert_eq!(topic.to_string(), "project:proj_123:user_456");
/// ```
pub fn validate_topic_format(topic: &str) -> Result<Topic, ValidationError> {
    let parts: Vec<&str> = topic.split(':').collect();
    let [kind, resource_id, user_id] = parts.as_slice() else {
        return Err(ValidationError::InvalidTopicFormat(format!(
            "expected <type>:<resource_id>:<user_id>, got {} segment(s)",
            parts.len()
        )));
    };

    let topic_type =
        TopicType::parse(kind).ok_or_else(|| ValidationError::InvalidTopicType((*kind).into()))?;
    validate_id("resource ID", resource_id)?;
    validate_id("user ID", user_id)?;

    Ok(Topic {
        topic_type,
        resource_id: (*resource_id).to_string(),
        user_id: (*user_id).to_string(),
    })
}
