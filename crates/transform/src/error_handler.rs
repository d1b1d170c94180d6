//! Error classification, logging and retry verdicts.
//!
//! Classification matches the rendered error message (lower-cased) against an
//! ordered rule table; the first matching rule wins. Keeping the rules as data
//! makes the priority order explicit and testable on its own.
use std::error::Error;
use std::sync::Arc;

use tracing::{error, warn};

use crate::category::{ErrorType, MessageType};
use crate::metrics::TransformMetrics;

type Rule = (fn(&str) -> bool, ErrorType);

fn is_json_parse(m: &str) -> bool {
    m.contains("invalid json format")
}

fn is_validation(m: &str) -> bool {
    m.contains("validation") && !m.contains("output validation")
}

fn is_missing_field(m: &str) -> bool {
    m.contains("missing required field")
}

fn is_invalid_status(m: &str) -> bool {
    m.contains("invalid status")
}

fn is_invalid_platform(m: &str) -> bool {
    m.contains("invalid platform")
}

fn is_invalid_value(m: &str) -> bool {
    m.contains("invalid value")
}

fn is_output_validation(m: &str) -> bool {
    m.contains("output validation")
}

fn is_transform(m: &str) -> bool {
    m.contains("transform")
}

fn is_rate_limit(m: &str) -> bool {
    m.contains("rate limit")
}

/// Priority-ordered classification rules. Input is the lower-cased message.
/// `validation` skips "output validation" so transformer bugs keep their own bucket.
const RULES: &[Rule] = &[
    (is_json_parse, ErrorType::JsonParse),
    (is_validation, ErrorType::Validation),
    (is_missing_field, ErrorType::MissingField),
    (is_invalid_status, ErrorType::InvalidStatus),
    (is_invalid_platform, ErrorType::InvalidPlatform),
    (is_invalid_value, ErrorType::InvalidValue),
    (is_output_validation, ErrorType::OutputValidation),
    (is_transform, ErrorType::Transform),
    (is_rate_limit, ErrorType::RateLimitExceeded),
];

/// Classify an error by its rendered message.
pub fn classify_error(err: &dyn Error) -> ErrorType {
    classify_message(&err.to_string())
}

/// Classify a rendered error message.
pub fn classify_message(message: &str) -> ErrorType {
    let lowered = message.to_lowercase();
    RULES
        .iter()
        .find(|(matches, _)| matches(lowered.as_str()))
        .map(|(_, error_type)| *error_type)
        .unwrap_or(ErrorType::Unknown)
}

/// Deterministic failures are never worth retrying.
pub fn should_retry_transform(err: &dyn Error) -> bool {
    !classify_error(err).is_deterministic()
}

const ELISION: &str = " ... ";

/// Shorten `payload` to at most `max_chars` characters for logging.
///
/// JSON-looking payloads keep a head and a tail around an elision marker so
/// both ends of the structure stay readable; anything else is cut and
/// suffixed with `...`. Cuts always land on character boundaries.
pub fn truncate_payload(payload: &[u8], max_chars: usize) -> String {
    let text = String::from_utf8_lossy(payload);
    let len = text.chars().count();
    if len <= max_chars {
        return text.into_owned();
    }

    let trimmed = text.trim_start();
    let looks_like_json = trimmed.starts_with('{') || trimmed.starts_with('[');
    if looks_like_json && max_chars > ELISION.len() + 2 {
        let budget = max_chars - ELISION.len();
        let head = budget / 2;
        let tail = budget - head;
        let mut out: String = text.chars().take(head).collect();
        out.push_str(ELISION);
        out.extend(text.chars().skip(len - tail));
        out
    } else {
        let keep = max_chars.saturating_sub(3);
        let mut out: String = text.chars().take(keep).collect();
        out.push_str("...");
        out
    }
}

/// What was being processed when an error surfaced.
#[derive(Debug, Clone, Copy)]
pub struct ErrorContext<'a> {
    pub message_type: MessageType,
    /// `<type>:<resource_id>:<user_id>` when the topic is known, else the raw channel.
    pub channel: Option<&'a str>,
    pub payload: &'a [u8],
}

/// Error reporting capability used by the transform façade.
pub trait ErrorReporter: Send + Sync {
    /// Classify, record and log `err`. Returns the category it fell into.
    fn handle_error(&self, err: &dyn Error, ctx: &ErrorContext<'_>) -> ErrorType;
}

/// Default reporter: counts handled errors and logs them through `tracing`.
pub struct ErrorHandler {
    metrics: Arc<dyn TransformMetrics>,
    max_payload_chars: usize,
}

impl ErrorHandler {
    pub fn new(metrics: Arc<dyn TransformMetrics>, max_payload_chars: usize) -> Self {
        Self {
            metrics,
            max_payload_chars,
        }
    }
}

impl ErrorReporter for ErrorHandler {
    fn handle_error(&self, err: &dyn Error, ctx: &ErrorContext<'_>) -> ErrorType {
        let error_type = classify_error(err);
        self.metrics.record_handled_error(error_type);

        let payload = truncate_payload(ctx.payload, self.max_payload_chars);
        let channel = ctx.channel.unwrap_or("-");
        let retryable = !error_type.is_deterministic();

        if error_type.is_critical() {
            error!(
                error_type = error_type.as_str(),
                message_type = ctx.message_type.as_str(),
                channel,
                payload = %payload,
                error = %err,
                "transform_failed_critical"
            );
        } else if error_type.is_deterministic() || error_type == ErrorType::RateLimitExceeded {
            warn!(
                error_type = error_type.as_str(),
                message_type = ctx.message_type.as_str(),
                channel,
                payload = %payload,
                error = %err,
                "transform_rejected_input"
            );
        } else {
            error!(
                error_type = error_type.as_str(),
                message_type = ctx.message_type.as_str(),
                channel,
                payload = %payload,
                error = %err,
                retryable,
                "transform_failed"
            );
        }
        error_type
    }
}
