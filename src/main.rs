//! ircws - WebSocket to IRC relay.

use ircws::{Config, Gateway, telemetry};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ircws.toml".to_string());
    let config = Config::load(&config_path)?;

    telemetry::init(config.log.format)?;

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        upstream = %config.upstream.host,
        port = config.upstream.port,
        tls = config.upstream.tls,
        open_target = config.upstream.allow_client_target,
        "Starting ircws"
    );

    let gateway = Gateway::bind(&config).await?;

    tokio::select! {
        result = gateway.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
