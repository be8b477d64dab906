//! `promptgate serve` — Start the HTTP gateway server.

use promptgate_config::ServerConfig;
use std::path::PathBuf;

pub async fn run(
    port_override: Option<u16>,
    config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::load(config_path.as_deref())
        .map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.port = port;
    }

    println!("Promptgate Gateway");
    println!("   Listening: {}:{}", config.host, config.port);
    println!("   Config header: x-promptgate-config");

    promptgate_gateway::start(config).await?;

    Ok(())
}
