//! WebSocket match server binary.

use fourline_server::config::Config;
use fourline_server::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    tracing::info!(
        addr = %config.socket_addr_string(),
        max_clients = config.max_clients,
        "starting fourline-server"
    );

    server::run(config).await
}
