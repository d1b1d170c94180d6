use std::error::Error;

use progress_relay::{
    classify_error, is_rate_limit_error, should_retry_transform, ErrorType, LimitKind,
    MessageType, MessageValidator, Relay, RelayConfig, SchemaValidator, TransformError,
};
use transform::classify_message;

const MALFORMED: &[&[u8]] = &[b"", b"not json", b"{", b"[1,2", b"{\"platform\":}"];

#[test]
fn malformed_json_is_reported_at_every_entry_point() {
    let validator = SchemaValidator::new();
    let relay = Relay::new(&RelayConfig::default());
    let transformer = relay.transformer();

    for payload in MALFORMED {
        let messages = [
            validator.validate_project_input(payload).unwrap_err().to_string(),
            validator.validate_job_input(payload).unwrap_err().to_string(),
            transformer
                .transform_project_message(payload)
                .unwrap_err()
                .to_string(),
            transformer
                .transform_job_message(payload)
                .unwrap_err()
                .to_string(),
            transformer
                .transform_message("job:j1:u1", payload)
                .unwrap_err()
                .to_string(),
        ];
        for message in messages {
            assert!(
                message.contains("invalid JSON format"),
                "{payload:?}: {message}"
            );
        }
    }
}

#[test]
fn malformed_json_fails_validation_but_is_handled_as_json_parse() {
    let relay = Relay::new(&RelayConfig::default());
    let err = relay.transform("project:p1:u1", b"{oops").unwrap_err();

    assert_eq!(classify_error(&err), ErrorType::JsonParse);
    assert!(!should_retry_transform(&err));
    let metrics = relay.metrics();
    assert_eq!(metrics.error_count(MessageType::Project, ErrorType::Validation), 1);
    assert_eq!(metrics.error_count(MessageType::Project, ErrorType::JsonParse), 0);
    assert_eq!(metrics.handled_count(ErrorType::JsonParse), 1);
}

#[test]
fn null_fields_accepted_by_the_validator_also_decode() {
    let relay = Relay::new(&RelayConfig::default());
    let cases: [(&str, &[u8]); 3] = [
        ("project:p1:u1", br#"{"progress":{"percentage":null}}"#),
        (
            "job:j1:u1",
            br#"{"platform":"TIKTOK","batch":{"keyword":"k","crawled_at":"2024-05-01T10:00:00Z","content_list":[{"id":"a","text":null,"published_at":"2024-05-01T09:00:00Z"}]}}"#,
        ),
        (
            "job:j1:u1",
            br#"{"platform":"TIKTOK","batch":{"keyword":"k","crawled_at":"2024-05-01T10:00:00Z","content_list":[{"id":"a","author":null,"published_at":"2024-05-01T09:00:00Z"}]}}"#,
        ),
    ];

    for (channel, payload) in cases {
        assert!(relay.transform(channel, payload).is_ok(), "{channel}");
    }
    let metrics = relay.metrics();
    assert_eq!(metrics.total_errors(MessageType::Project), 0);
    assert_eq!(metrics.total_errors(MessageType::Job), 0);
    assert_eq!(metrics.handled_count(ErrorType::JsonParse), 0);
}

#[test]
fn input_errors_keep_their_cause_and_are_not_retried() {
    let relay = Relay::new(&RelayConfig::default());
    let cases: [(&str, &[u8], &str); 5] = [
        ("job:j1:u1", br#"{"status":"PAUSED"}"#, "missing required field: platform"),
        ("job:j1:u1", br#"{"platform":"FACEBOOK"}"#, "invalid platform: FACEBOOK"),
        ("job:j1:u1", br#"{"platform":"TIKTOK","status":"DONE"}"#, "invalid status: DONE"),
        (
            "project:p1:u1",
            br#"{"progress":{"percentage":"half"}}"#,
            "invalid value for progress.percentage",
        ),
        ("chat:p1:u1", b"{}", "invalid topic type: chat"),
    ];

    for (channel, payload, cause) in cases {
        let err = relay.transform(channel, payload).unwrap_err();
        assert!(err.to_string().contains(cause), "{channel}: {err}");
        // Layered input errors read "... validation failed: <cause>".
        assert_eq!(classify_error(&err), ErrorType::Validation, "{channel}: {err}");
        assert!(!should_retry_transform(&err));
    }
    assert_eq!(relay.metrics().handled_count(ErrorType::Validation), 5);
}

#[test]
fn unwrapped_causes_classify_by_kind() {
    let cases = [
        ("missing required field: platform", ErrorType::MissingField),
        ("invalid status: DONE", ErrorType::InvalidStatus),
        ("invalid platform: FACEBOOK", ErrorType::InvalidPlatform),
        ("invalid value for eta: expected number", ErrorType::InvalidValue),
        ("output validation failed for job message", ErrorType::OutputValidation),
        ("connection reset by peer", ErrorType::Unknown),
    ];
    for (message, expected) in cases {
        assert_eq!(classify_message(message), expected, "{message}");
    }
}

#[test]
fn bad_topic_is_counted_against_unknown() {
    let relay = Relay::new(&RelayConfig::default());
    let err = relay.transform("project:p1", b"{}").unwrap_err();

    assert!(matches!(err, TransformError::Topic(_)));
    assert!(err.to_string().contains("invalid topic format"));
    assert_eq!(
        relay
            .metrics()
            .error_count(MessageType::Unknown, ErrorType::Validation),
        1
    );
}

#[test]
fn rejected_connections_are_rate_limit_errors() {
    let relay = Relay::new(&RelayConfig::default());
    for _ in 0..3 {
        relay.admit("u1", None, Some("job_1")).unwrap();
    }
    let err = relay.admit("u1", None, Some("job_1")).unwrap_err();

    assert_eq!(err.limit, LimitKind::MaxConnectionsPerUserPerJob);
    assert_eq!((err.current, err.max), (3, 3));
    assert!(is_rate_limit_error(&err));
    assert_eq!(classify_error(&err), ErrorType::RateLimitExceeded);
    assert!(should_retry_transform(&err));

    let transform_err = relay.transform("job:j1:u1", b"nope").unwrap_err();
    assert!(!is_rate_limit_error(&transform_err));
}

#[test]
fn rate_limit_errors_are_found_through_a_source_chain() {
    #[derive(Debug)]
    struct Wrapped(progress_relay::RateLimitError);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("socket refused")
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    let relay = Relay::new(&RelayConfig::default());
    for _ in 0..10 {
        relay.admit("u2", None, None).unwrap();
    }
    let err = Wrapped(relay.admit("u2", None, None).unwrap_err());
    assert!(is_rate_limit_error(&err));
}
