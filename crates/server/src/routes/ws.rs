//! Websocket subscriptions.
//!
//! Admission runs before the upgrade so a refused client gets a plain HTTP
//! 429 with the limit name. Once admitted, the quota is held by a
//! [`ConnectionGuard`] that releases it on drop, whether the socket closes
//! normally or the upgrade never completes.
use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use messages::{Topic, TopicType};
use progress_relay::Relay;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Header carrying the caller's identity, set by the authenticating proxy
pub const USER_ID_HEADER: &str = "x-user-id";

/// Releases an admitted connection's quota when dropped.
pub struct ConnectionGuard {
    relay: Arc<Relay>,
    user_id: String,
    project_id: Option<String>,
    job_id: Option<String>,
}

impl ConnectionGuard {
    fn admit(relay: Arc<Relay>, topic: &Topic) -> ServerResult<Self> {
        let (project_id, job_id) = match topic.topic_type {
            TopicType::Project => (Some(topic.resource_id.clone()), None),
            TopicType::Job => (None, Some(topic.resource_id.clone())),
        };
        relay.admit(&topic.user_id, project_id.as_deref(), job_id.as_deref())?;
        Ok(Self {
            relay,
            user_id: topic.user_id.clone(),
            project_id,
            job_id,
        })
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.relay.release(
            &self.user_id,
            self.project_id.as_deref(),
            self.job_id.as_deref(),
        );
    }
}

fn user_id(headers: &HeaderMap) -> ServerResult<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| {
            ServerError::Authentication(format!("'{USER_ID_HEADER}' header required"))
        })
}

/// `GET /ws/project/{project_id}`
pub async fn project_socket(
    State(state): State<Arc<ServerState>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ServerResult<Response> {
    open_socket(state, TopicType::Project, project_id, &headers, ws)
}

/// `GET /ws/job/{job_id}`
pub async fn job_socket(
    State(state): State<Arc<ServerState>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> ServerResult<Response> {
    open_socket(state, TopicType::Job, job_id, &headers, ws)
}

fn open_socket(
    state: Arc<ServerState>,
    topic_type: TopicType,
    resource_id: String,
    headers: &HeaderMap,
    ws: WebSocketUpgrade,
) -> ServerResult<Response> {
    let user_id = user_id(headers)?;
    let topic = Topic::new(topic_type, resource_id, user_id)
        .map_err(|err| ServerError::BadRequest(err.to_string()))?;
    let guard = ConnectionGuard::admit(state.relay.clone(), &topic)?;

    let failed_topic = topic.to_string();
    Ok(ws
        .on_failed_upgrade(move |err| {
            warn!(channel = %failed_topic, error = %err, "websocket_upgrade_failed");
        })
        .on_upgrade(move |socket| run_session(socket, state, topic, guard)))
}

async fn run_session(socket: WebSocket, state: Arc<ServerState>, topic: Topic, guard: ConnectionGuard) {
    let channel = topic.to_string();
    let started = Instant::now();
    let mut subscription = state
        .hub
        .subscribe(&channel, state.config.session_channel_capacity);
    metrics::gauge!("relay_ws_sessions_active").increment(1.0);
    info!(channel = %channel, session_id = subscription.id, "websocket_session_opened");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            outbound = subscription.receiver.recv() => {
                let Some(text) = outbound else { break };
                if let Err(err) = sink.send(Message::Text(text.into())).await {
                    debug!(channel = %channel, error = %err, "websocket_send_failed");
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        debug!(channel = %channel, error = %err, "websocket_receive_failed");
                        break;
                    }
                }
            }
        }
    }

    state.hub.unsubscribe(&channel, subscription.id);
    drop(guard);
    metrics::gauge!("relay_ws_sessions_active").decrement(1.0);
    info!(
        channel = %channel,
        session_id = subscription.id,
        duration_secs = started.elapsed().as_secs(),
        "websocket_session_closed"
    );
}
