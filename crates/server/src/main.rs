//! Relay Server binary
//!
//! Loads configuration from the environment (and an optional
//! `relay-server` config file) and serves until SIGTERM or Ctrl+C.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    server::start_server(config).await?;
    Ok(())
}
