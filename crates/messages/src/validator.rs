//! Schema validation of raw publisher payloads.
//!
//! Validation runs on the untyped JSON tree so failures can name the exact
//! field and rule that broke, instead of surfacing a generic deserializer
//! message. Nothing here mutates or normalizes the payload; out-of-range
//! percentages are accepted because transformers clamp them.
//!
//! Project payloads come in two shapes. [`SchemaValidator::validate_project_input`]
//! sniffs the shape once and returns a [`ProjectFormat`] tag so downstream code
//! branches on the tag rather than re-inspecting the JSON.
use chrono::DateTime;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ValidationError;
use crate::topic::{validate_topic_format, Topic};
use crate::types::{JobStatus, PhaseMessageType, PhaseStatus, Platform, ProjectStatus};

/// Which project message layout a payload uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFormat {
    /// `{status?, progress?}`.
    Legacy,
    /// `{type, payload: {...}}`.
    Phase,
}

/// Validation capability consumed by the transform layer.
pub trait MessageValidator: Send + Sync {
    /// Check a project payload and report which layout it uses.
    fn validate_project_input(&self, payload: &[u8]) -> Result<ProjectFormat, ValidationError>;

    /// Check a job payload.
    fn validate_job_input(&self, payload: &[u8]) -> Result<(), ValidationError>;

    /// Parse a `<type>:<resource_id>:<user_id>` topic.
    fn validate_topic_format(&self, topic: &str) -> Result<Topic, ValidationError>;
}

/// Stateless validator for the built-in message schemas.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }
}

impl MessageValidator for SchemaValidator {
    fn validate_project_input(&self, payload: &[u8]) -> Result<ProjectFormat, ValidationError> {
        let result = parse_object(payload).and_then(|root| {
            let format = detect_project_format(&root);
            debug!(format = ?format, "project_format_detected");
            let checked = match format {
                ProjectFormat::Legacy => validate_legacy_project(&root),
                ProjectFormat::Phase => validate_phase_project(&root),
            };
            checked.map(|()| format)
        });
        result.map_err(|err| err.in_layer("project input"))
    }

    fn validate_job_input(&self, payload: &[u8]) -> Result<(), ValidationError> {
        parse_object(payload)
            .and_then(|root| validate_job(&root))
            .map_err(|err| err.in_layer("job input"))
    }

    fn validate_topic_format(&self, topic: &str) -> Result<Topic, ValidationError> {
        validate_topic_format(topic)
    }
}

fn parse_object(payload: &[u8]) -> Result<Map<String, Value>, ValidationError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|err| ValidationError::InvalidJson(err.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ValidationError::invalid_value(
            "$",
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
    }
}

/// A payload is phase-based when it carries the `{type, payload}` envelope.
fn detect_project_format(root: &Map<String, Value>) -> ProjectFormat {
    if root.contains_key("type") && root.contains_key("payload") {
        ProjectFormat::Phase
    } else {
        ProjectFormat::Legacy
    }
}

fn validate_legacy_project(root: &Map<String, Value>) -> Result<(), ValidationError> {
    if let Some(status) = present(root, "status") {
        let status = status
            .as_str()
            .ok_or_else(|| ValidationError::InvalidStatus(status.to_string()))?;
        if ProjectStatus::parse(status).is_none() {
            return Err(ValidationError::InvalidStatus(status.into()));
        }
    }
    if let Some(progress) = present(root, "progress") {
        validate_progress(progress, "progress")?;
    }
    Ok(())
}

fn validate_phase_project(root: &Map<String, Value>) -> Result<(), ValidationError> {
    let message_type = require_str(root, "type", "type")?;
    if PhaseMessageType::parse(message_type).is_none() {
        return Err(ValidationError::invalid_value(
            "type",
            format!("unsupported message type {message_type:?}"),
        ));
    }

    let payload = require(root, "payload", "payload")?;
    let payload = as_object(payload, "payload")?;

    let project_id = require_str(payload, "project_id", "payload.project_id")?;
    if project_id.is_empty() {
        return Err(ValidationError::MissingField("payload.project_id".into()));
    }

    let status = require_str(payload, "status", "payload.status")?;
    if PhaseStatus::parse(status).is_none() {
        return Err(ValidationError::InvalidStatus(status.into()));
    }

    for phase in ["crawl", "analyze"] {
        if let Some(progress) = present(payload, phase) {
            validate_phase_progress(progress, &format!("payload.{phase}"))?;
        }
    }

    let overall = require(
        payload,
        "overall_progress_percent",
        "payload.overall_progress_percent",
    )?;
    check_number(overall, "payload.overall_progress_percent")?;
    Ok(())
}

fn validate_job(root: &Map<String, Value>) -> Result<(), ValidationError> {
    let platform = require(root, "platform", "platform")?;
    let platform = platform
        .as_str()
        .ok_or_else(|| ValidationError::InvalidPlatform(platform.to_string()))?;
    if Platform::parse(platform).is_none() {
        return Err(ValidationError::InvalidPlatform(platform.into()));
    }

    if let Some(status) = present(root, "status") {
        let status = status
            .as_str()
            .ok_or_else(|| ValidationError::InvalidStatus(status.to_string()))?;
        if JobStatus::parse(status).is_none() {
            return Err(ValidationError::InvalidStatus(status.into()));
        }
    }

    if let Some(progress) = present(root, "progress") {
        validate_progress(progress, "progress")?;
    }
    if let Some(batch) = present(root, "batch") {
        validate_batch(batch)?;
    }
    Ok(())
}

fn validate_progress(value: &Value, path: &str) -> Result<(), ValidationError> {
    let progress = as_object(value, path)?;
    for key in ["current", "total"] {
        if let Some(v) = present(progress, key) {
            check_uint(v, &format!("{path}.{key}"))?;
        }
    }
    for key in ["percentage", "eta"] {
        if let Some(v) = present(progress, key) {
            check_number(v, &format!("{path}.{key}"))?;
        }
    }
    if let Some(errors) = present(progress, "errors") {
        let errors = errors.as_array().ok_or_else(|| {
            ValidationError::invalid_value(format!("{path}.errors"), "must be an array")
        })?;
        if let Some(idx) = errors.iter().position(|e| !e.is_string()) {
            return Err(ValidationError::invalid_value(
                format!("{path}.errors[{idx}]"),
                "must be a string",
            ));
        }
    }
    Ok(())
}

fn validate_phase_progress(value: &Value, path: &str) -> Result<(), ValidationError> {
    let progress = as_object(value, path)?;
    for key in ["total", "done", "errors"] {
        if let Some(v) = present(progress, key) {
            check_uint(v, &format!("{path}.{key}"))?;
        }
    }
    if let Some(v) = present(progress, "progress_percent") {
        check_number(v, &format!("{path}.progress_percent"))?;
    }
    Ok(())
}

fn validate_batch(value: &Value) -> Result<(), ValidationError> {
    let batch = as_object(value, "batch")?;
    let keyword = require(batch, "keyword", "batch.keyword")?;
    if !keyword.is_string() {
        return Err(ValidationError::invalid_value(
            "batch.keyword",
            "must be a string",
        ));
    }
    check_timestamp(
        require(batch, "crawled_at", "batch.crawled_at")?,
        "batch.crawled_at",
    )?;

    let Some(list) = present(batch, "content_list") else {
        return Ok(());
    };
    let list = list.as_array().ok_or_else(|| {
        ValidationError::invalid_value("batch.content_list", "must be an array")
    })?;
    for (idx, item) in list.iter().enumerate() {
        validate_content(item, &format!("batch.content_list[{idx}]"))?;
    }
    Ok(())
}

fn validate_content(value: &Value, path: &str) -> Result<(), ValidationError> {
    let content = as_object(value, path)?;

    let id = require_str(content, "id", &format!("{path}.id"))?;
    if id.is_empty() {
        return Err(ValidationError::MissingField(format!("{path}.id")));
    }
    check_timestamp(
        require(content, "published_at", &format!("{path}.published_at"))?,
        &format!("{path}.published_at"),
    )?;

    for key in ["text", "permalink"] {
        if let Some(v) = present(content, key) {
            if !v.is_string() {
                return Err(ValidationError::invalid_value(
                    format!("{path}.{key}"),
                    "must be a string",
                ));
            }
        }
    }

    if let Some(author) = present(content, "author") {
        let author_path = format!("{path}.author");
        let author = as_object(author, &author_path)?;
        for key in ["id", "username", "name", "avatar_url"] {
            if let Some(v) = present(author, key) {
                if !v.is_string() {
                    return Err(ValidationError::invalid_value(
                        format!("{author_path}.{key}"),
                        "must be a string",
                    ));
                }
            }
        }
        if let Some(followers) = present(author, "followers") {
            check_uint(followers, &format!("{author_path}.followers"))?;
        }
        if let Some(verified) = present(author, "is_verified") {
            if !verified.is_boolean() {
                return Err(ValidationError::invalid_value(
                    format!("{author_path}.is_verified"),
                    "must be a boolean",
                ));
            }
        }
    }

    if let Some(metrics) = present(content, "metrics") {
        let metrics_path = format!("{path}.metrics");
        let metrics = as_object(metrics, &metrics_path)?;
        for key in ["views", "likes", "comments", "shares"] {
            if let Some(v) = present(metrics, key) {
                check_uint(v, &format!("{metrics_path}.{key}"))?;
            }
        }
        if let Some(rate) = present(metrics, "rate") {
            check_number(rate, &format!("{metrics_path}.rate"))?;
        }
    }

    if let Some(media) = present(content, "media") {
        let media_path = format!("{path}.media");
        let media = as_object(media, &media_path)?;
        let kind = require_str(media, "type", &format!("{media_path}.type"))?;
        if kind.is_empty() {
            return Err(ValidationError::MissingField(format!("{media_path}.type")));
        }
        if let Some(duration) = present(media, "duration") {
            check_number(duration, &format!("{media_path}.duration"))?;
        }
    }
    Ok(())
}

/// Field value, treating explicit `null` as absent.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn require<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a Value, ValidationError> {
    present(obj, key).ok_or_else(|| ValidationError::MissingField(path.into()))
}

fn require_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a str, ValidationError> {
    require(obj, key, path)?
        .as_str()
        .ok_or_else(|| ValidationError::invalid_value(path, "must be a string"))
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| {
        ValidationError::invalid_value(path, format!("expected object, got {}", json_kind(value)))
    })
}

fn check_uint(value: &Value, path: &str) -> Result<(), ValidationError> {
    if value.as_u64().is_none() {
        return Err(ValidationError::invalid_value(
            path,
            format!("{value} is not a non-negative integer"),
        ));
    }
    Ok(())
}

fn check_number(value: &Value, path: &str) -> Result<(), ValidationError> {
    if !value.is_number() {
        return Err(ValidationError::invalid_value(
            path,
            format!("expected number, got {}", json_kind(value)),
        ));
    }
    Ok(())
}

fn check_timestamp(value: &Value, path: &str) -> Result<(), ValidationError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ValidationError::invalid_value(path, "must be an RFC 3339 string"))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|_| ())
        .map_err(|err| ValidationError::invalid_value(path, format!("{raw:?}: {err}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bytes(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn malformed_json_is_reported_as_json_error() {
        let validator = SchemaValidator::new();
        let payloads: [&[u8]; 3] = [b"{not json", b"", b"{\"status\":"];
        for payload in payloads {
            let err = validator.validate_project_input(payload).unwrap_err();
            assert!(err.to_string().contains("invalid JSON format"), "{err}");
            assert!(err.to_string().starts_with("project input validation failed"));

            let err = validator.validate_job_input(payload).unwrap_err();
            assert!(err.to_string().contains("invalid JSON format"), "{err}");
        }
    }

    #[test]
    fn detects_project_formats() {
        let validator = SchemaValidator::new();
        let legacy = bytes(json!({"status": "PROCESSING", "progress": {"current": 1, "total": 4, "percentage": 25.0}}));
        assert_eq!(
            validator.validate_project_input(&legacy).unwrap(),
            ProjectFormat::Legacy
        );

        let phase = bytes(json!({
            "type": "project_progress",
            "payload": {"project_id": "p1", "status": "PROCESSING", "overall_progress_percent": 10.0}
        }));
        assert_eq!(
            validator.validate_project_input(&phase).unwrap(),
            ProjectFormat::Phase
        );

        // status is optional in the legacy layout
        assert_eq!(
            validator.validate_project_input(b"{}").unwrap(),
            ProjectFormat::Legacy
        );
    }

    #[test]
    fn legacy_project_rejects_unknown_status() {
        let err = SchemaValidator
            .validate_project_input(&bytes(json!({"status": "EXPLODED"})))
            .unwrap_err();
        assert!(matches!(err.root(), ValidationError::InvalidStatus(s) if s == "EXPLODED"));
    }

    #[test]
    fn out_of_range_percentage_passes_input_validation() {
        let payload = bytes(json!({"progress": {"percentage": 180.5, "eta": -4}}));
        assert!(SchemaValidator.validate_project_input(&payload).is_ok());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let payload = bytes(json!({"progress": {"current": -1}}));
        let err = SchemaValidator.validate_project_input(&payload).unwrap_err();
        assert!(err.to_string().contains("progress.current"));
    }

    #[test]
    fn phase_project_rules() {
        let cases = [
            (
                json!({"type": "project_started", "payload": {"project_id": "p", "status": "DONE", "overall_progress_percent": 1}}),
                "unsupported message type",
            ),
            (
                json!({"type": "project_progress", "payload": {"status": "DONE", "overall_progress_percent": 1}}),
                "missing required field: payload.project_id",
            ),
            (
                json!({"type": "project_progress", "payload": {"project_id": "p", "status": "COMPLETED", "overall_progress_percent": 1}}),
                "invalid status: COMPLETED",
            ),
            (
                json!({"type": "project_progress", "payload": {"project_id": "p", "status": "DONE"}}),
                "missing required field: payload.overall_progress_percent",
            ),
            (
                json!({"type": "project_progress", "payload": {"project_id": "p", "status": "DONE", "overall_progress_percent": 1, "crawl": {"done": "x"}}}),
                "payload.crawl.done",
            ),
        ];
        for (payload, expected) in cases {
            let err = SchemaValidator
                .validate_project_input(&bytes(payload))
                .unwrap_err();
            assert!(err.to_string().contains(expected), "{err}");
        }
    }

    #[test]
    fn job_platform_rules() {
        let err = SchemaValidator
            .validate_job_input(&bytes(json!({"status": "PROCESSING"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "job input validation failed: missing required field: platform"
        );

        let err = SchemaValidator
            .validate_job_input(&bytes(json!({"platform": "FACEBOOK"})))
            .unwrap_err();
        assert!(matches!(err.root(), ValidationError::InvalidPlatform(p) if p == "FACEBOOK"));

        let err = SchemaValidator
            .validate_job_input(&bytes(json!({"platform": "TIKTOK", "status": "RUNNING"})))
            .unwrap_err();
        assert!(matches!(err.root(), ValidationError::InvalidStatus(_)));

        assert!(SchemaValidator
            .validate_job_input(&bytes(json!({"platform": "YOUTUBE"})))
            .is_ok());
    }

    #[test]
    fn job_batch_rules() {
        let valid = json!({
            "platform": "TIKTOK",
            "batch": {
                "keyword": "rust",
                "crawled_at": "2024-05-01T10:00:00Z",
                "content_list": [{
                    "id": "c1",
                    "text": "hi",
                    "author": {"id": "a1", "username": "ann", "followers": 10, "is_verified": true},
                    "metrics": {"views": 1, "likes": 2, "comments": 3, "shares": 4, "rate": 0.5},
                    "media": {"type": "video", "duration": 12.5},
                    "published_at": "2024-05-01T09:00:00Z",
                    "permalink": "https://example.com/c1"
                }]
            }
        });
        assert!(SchemaValidator.validate_job_input(&bytes(valid)).is_ok());

        let missing_id = json!({
            "platform": "TIKTOK",
            "batch": {"keyword": "k", "crawled_at": "2024-05-01T10:00:00Z",
                      "content_list": [{"published_at": "2024-05-01T09:00:00Z"}]}
        });
        let err = SchemaValidator
            .validate_job_input(&bytes(missing_id))
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("missing required field: batch.content_list[0].id"));

        let bad_time = json!({
            "platform": "TIKTOK",
            "batch": {"keyword": "k", "crawled_at": "yesterday"}
        });
        let err = SchemaValidator.validate_job_input(&bytes(bad_time)).unwrap_err();
        assert!(err.to_string().contains("batch.crawled_at"));
    }

    #[test]
    fn non_object_payload_is_invalid_value() {
        let err = SchemaValidator.validate_job_input(b"[1,2]").unwrap_err();
        assert!(err.to_string().contains("expected a JSON object, got array"));
        assert!(!err.is_json_error());
    }
}
