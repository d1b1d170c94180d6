//! Integration tests for the relay HTTP surface
//!
//! Requests are driven through the full router (auth, request IDs, error
//! mapping) with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use std::sync::Arc;
use tower::ServiceExt;

const API_KEY: &str = "test-api-key";

fn create_test_state() -> Arc<ServerState> {
    let mut config = ServerConfig::default();
    config.api_keys.insert(API_KEY.to_string());
    config.rate_limit_per_minute = 1000;
    Arc::new(ServerState::new(config).expect("Failed to create test state"))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn publish_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/publish")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let app = build_router(create_test_state());
    let request = Request::get("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "relay-server");
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = build_router(create_test_state());
    let request = Request::get("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = build_router(create_test_state());
    let request = Request::get("/nope").body(Body::empty()).unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn publish_requires_api_key() {
    let app = build_router(create_test_state());
    let request = Request::post("/api/v1/publish")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"channel": "job:j1:u1", "payload": {"platform": "TIKTOK"}}).to_string(),
        ))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_FAILED");
}

#[tokio::test]
async fn publish_accepts_bearer_token() {
    let app = build_router(create_test_state());
    let request = Request::post("/api/v1/publish")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {API_KEY}"))
        .body(Body::from(
            json!({"channel": "job:j1:u1", "payload": {"platform": "TIKTOK"}}).to_string(),
        ))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_type"], "job");
    assert_eq!(body["delivered"], 0);
}

#[tokio::test]
async fn publish_transforms_and_delivers_to_subscribers() {
    let state = create_test_state();
    let app = build_router(state.clone());
    let mut subscription = state.hub.subscribe("project:proj_123:user_456", 4);

    let (status, body) = send(
        &app,
        publish_request(json!({
            "channel": "project:proj_123:user_456",
            "payload": {
                "status": "PROCESSING",
                "progress": {"current": 5, "total": 4, "percentage": 125.0, "eta": -10.0}
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_type"], "project");
    assert_eq!(body["delivered"], 1);

    let text = subscription.receiver.recv().await.unwrap();
    let delivered: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(delivered["status"], "PROCESSING");
    assert_eq!(delivered["progress"]["percentage"], 100.0);
    assert_eq!(delivered["progress"]["eta"], 0.0);
    assert_eq!(delivered["progress"]["errors"], json!([]));
}

#[tokio::test]
async fn publish_rejects_invalid_payload_as_unprocessable() {
    let state = create_test_state();
    let app = build_router(state.clone());

    let (status, body) = send(
        &app,
        publish_request(json!({
            "channel": "job:j1:u1",
            "payload": {"platform": "FACEBOOK"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "TRANSFORM_ERROR");
    assert_eq!(body["error"]["details"]["error_type"], "validation");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("invalid platform"));
}

#[tokio::test]
async fn publish_raw_text_payload_reports_invalid_json() {
    let app = build_router(create_test_state());

    let (status, body) = send(
        &app,
        publish_request(json!({"channel": "job:j1:u1", "payload": "{not json"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"]["error_type"], "json_parse");
}

#[tokio::test]
async fn publish_rejects_bad_channel() {
    let app = build_router(create_test_state());

    let (status, body) = send(
        &app,
        publish_request(json!({"channel": "notification:x:u1", "payload": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_TOPIC");
}

#[tokio::test]
async fn stats_reflect_publishing_and_admission() {
    let state = create_test_state();
    let app = build_router(state.clone());

    state.relay.admit("user_456", Some("proj_123"), None).unwrap();
    send(
        &app,
        publish_request(json!({"channel": "job:j1:u1", "payload": {"platform": "YOUTUBE"}})),
    )
    .await;
    send(
        &app,
        publish_request(json!({"channel": "job:j1:u1", "payload": {"platform": "MYSPACE"}})),
    )
    .await;

    let request = Request::get("/api/v1/stats")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admission"]["tracked_users"], 1);
    assert_eq!(body["admission"]["total_connections"], 1);
    assert_eq!(body["transform"]["message_types"]["job"]["successes"], 1);
    assert_eq!(
        body["transform"]["message_types"]["job"]["errors"]["validation"],
        1
    );
    assert_eq!(
        body["transform"]["handled_errors"]["validation"],
        1
    );
    assert_eq!(body["hub"]["sessions"], 0);
}

#[tokio::test]
async fn metrics_without_recorder_fall_back_to_snapshot() {
    let app = build_router(create_test_state());
    let request = Request::get("/metrics").body(Body::empty()).unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message_types"].is_object());
}
