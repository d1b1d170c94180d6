//! Relay Server - websocket fan-out for project and job progress
//!
//! Browsers subscribe to a topic over a websocket; publishers POST raw
//! pub/sub messages, which are transformed into client notifications and
//! delivered to every socket subscribed to the same topic.
//!
//! - **Admission**: per-user, per-project and per-job connection limits plus
//!   a sliding-window rate limit, checked before the websocket upgrade
//! - **Transformation**: validation, normalization and deduplication of
//!   project and job updates
//! - **Fan-out**: bounded per-session queues; a slow socket drops messages
//!   instead of stalling the publisher
//! - **Health & Metrics**: liveness/readiness probes and Prometheus metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Endpoints
//!
//! ## Public
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//! - `GET /ws/project/{project_id}` - Project topic subscription (`x-user-id` header)
//! - `GET /ws/job/{job_id}` - Job topic subscription (`x-user-id` header)
//!
//! ## Publisher (API Key Required)
//!
//! - `POST /api/v1/publish` - Transform and deliver one pub/sub message
//! - `GET /api/v1/stats` - Admission, transform and fan-out statistics

pub mod config;
pub mod error;
pub mod hub;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use hub::{Hub, HubStats, Subscription};
pub use server::{build_router, start_server};
pub use state::ServerState;
