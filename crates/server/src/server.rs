//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration for sockets, publishing and probes
//! - Middleware stack (auth, logging, request IDs, CORS)
//! - Sweeper lifecycle and graceful shutdown

use crate::config::ServerConfig;
use crate::middleware::{api_key_auth, log_requests, request_id};
use crate::routes::{api_info, not_found};
use crate::routes::{health, publish, ws};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// - Public routes: `/`, `/health`, `/ready`, `/metrics`
/// - Socket routes: `/ws/project/{project_id}`, `/ws/job/{job_id}` (caller
///   identity from `x-user-id`, admission checked before upgrade)
/// - Protected routes: `/api/v1/*` (publisher API key required)
///
/// The request timeout applies to HTTP routes only; sockets stay open.
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let public_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ));

    let socket_routes = Router::new()
        .route("/ws/project/{project_id}", get(ws::project_socket))
        .route("/ws/job/{job_id}", get(ws::job_socket));

    let protected_routes = Router::new()
        .route("/api/v1/publish", post(publish::publish))
        .route("/api/v1/stats", get(health::relay_stats))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(from_fn_with_state(state.clone(), api_key_auth))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CompressionLayer::new());

    Router::new()
        .merge(public_routes)
        .merge(socket_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the relay server
///
/// 1. Sets up structured JSON logging with the configured log level
/// 2. Installs the Prometheus recorder when metrics are enabled
/// 3. Creates shared state and starts the admission sweeper
/// 4. Serves until SIGTERM or Ctrl+C, then stops the sweeper
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let mut state = ServerState::new(config.clone())?;
    if config.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        state = state.with_prometheus(handle);
    }
    let state = Arc::new(state);
    let sweeper = state.relay.start_sweeper();

    let app = build_router(state.clone());
    let addr: SocketAddr = config.socket_addr()?;

    let admission = &config.relay.admission;
    tracing::info!(
        "Starting relay server on {} with {} API keys",
        addr,
        config.api_keys.len()
    );
    tracing::info!(
        "Admission: {} per user, {} per project, {} per job, {} new connections per {}s",
        admission.max_connections_per_user,
        admission.max_connections_per_user_per_project,
        admission.max_connections_per_user_per_job,
        admission.connection_rate_limit,
        admission.rate_limit_window_secs
    );
    tracing::info!(
        "CORS: {}, Metrics: {}",
        config.enable_cors,
        config.metrics_enabled
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
