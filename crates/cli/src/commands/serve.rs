//! `coderelay serve`: Start the Slack events gateway.

use std::path::Path;
use tracing::info;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        info!(port, configured = config.gateway.port, "Overriding gateway port");
        config.gateway.port = port;
    }

    config.require_runtime_secrets()?;

    println!("CodeRelay Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Events:    POST /slack/events");
    println!("   Model:     {}", config.model);

    coderelay_gateway::start(config).await?;

    Ok(())
}
