use progress_relay::RelayConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds (HTTP routes only; sockets are long-lived)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum publish body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Publisher rate limit: requests per minute per API key
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// Publisher API keys
    #[serde(default)]
    pub api_keys: HashSet<String>,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Outbound messages buffered per websocket session before new ones are
    /// dropped
    #[serde(default = "default_session_channel_capacity")]
    pub session_channel_capacity: usize,

    /// Optional YAML file with the relay core configuration. Overrides `relay`.
    #[serde(default)]
    pub relay_config_path: Option<String>,

    /// Admission limits and transform settings
    #[serde(default)]
    pub relay: RelayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            api_keys: HashSet::new(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            session_channel_capacity: default_session_channel_capacity(),
            relay_config_path: None,
            relay: RelayConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `relay-server` config file
    /// and `RELAY_SERVER__*` environment variables (in increasing priority).
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("relay-server").required(false))
            .add_source(
                config::Environment::with_prefix("RELAY_SERVER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api_keys")
                    .try_parsing(true),
            );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;

        if let Some(path) = &config.relay_config_path {
            config.relay = RelayConfig::from_file(path)?;
        }
        config.validate()?;

        if config.api_keys.is_empty() {
            tracing::warn!("No API keys configured, using demo key 'demo-key-12345'");
            config.api_keys.insert("demo-key-12345".to_string());
        }

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session_channel_capacity == 0 {
            anyhow::bail!("session_channel_capacity must be > 0");
        }
        self.relay.validate()?;
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    1
}

fn default_rate_limit_per_minute() -> u32 {
    600
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_channel_capacity() -> usize {
    64
}
