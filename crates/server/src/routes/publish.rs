use crate::error::ServerResult;
use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use transform::MessageType;

/// One pub/sub message as the backend would have published it
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    /// `<type>:<resource_id>:<user_id>`
    pub channel: String,
    /// The message body. A JSON string is taken as the raw payload text, any
    /// other JSON value is used as-is.
    pub payload: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublishResponse {
    pub message_type: String,
    pub delivered: usize,
}

fn payload_bytes(payload: Value) -> ServerResult<Vec<u8>> {
    match payload {
        Value::String(raw) => Ok(raw.into_bytes()),
        other => Ok(serde_json::to_vec(&other)?),
    }
}

/// Transform a publisher message and deliver it to the topic's sockets
pub async fn publish(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<PublishRequest>,
) -> ServerResult<Json<PublishResponse>> {
    let payload = payload_bytes(request.payload)?;
    let (topic, message) = state.relay.transform(&request.channel, &payload)?;
    let text = message.to_json()?;

    let message_type: MessageType = message.message_type();
    let delivered = state.hub.publish(&topic.to_string(), &text);
    tracing::debug!(
        channel = %topic,
        message_type = message_type.as_str(),
        delivered,
        "message_published"
    );

    Ok(Json(PublishResponse {
        message_type: message_type.as_str().to_string(),
        delivered,
    }))
}
