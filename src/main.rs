//! chanmod - IRC channel moderation assistant
//!
//! Usage: `chanmod [config.toml]`. Moderator commands are read from stdin.

use chanmod::config::{Config, validate};
use chanmod::{client, http, metrics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "chanmod.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        address = %config.server.address,
        nick = %config.server.nick,
        channels = ?config.server.channels,
        "Starting chanmod"
    );

    if let Some(port) = config.metrics.port {
        metrics::init();
        tokio::spawn(http::run_http_server(port));
    }

    client::run(config).await
}
