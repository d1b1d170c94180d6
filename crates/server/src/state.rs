use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::hub::Hub;
use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use progress_relay::Relay;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Publisher rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, Instant)>>,

    /// Admission tracker and transform pipeline
    pub relay: Arc<Relay>,

    /// Topic fan-out to open sockets
    pub hub: Arc<Hub>,

    /// Prometheus render handle, present once the recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;
        let relay = Arc::new(Relay::new(&config.relay));

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            relay,
            hub: Arc::new(Hub::new()),
            prometheus: None,
        })
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Fixed-window publisher rate limit per API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}
