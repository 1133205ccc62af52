//! Listener and top-level server wiring.
//!
//! This module:
//! - Binds the configured address/port.
//! - Accepts TCP connections and gates them on `max_clients`.
//! - Spawns a per-connection task for the WebSocket lifecycle.
//!
//! The per-connection logic lives in the `connection` module; match
//! orchestration lives in `coordinator`.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection;
use crate::coordinator::Coordinator;
use crate::events::LogPublisher;
use crate::store::MemoryStore;

/// Run the server with the given configuration and the default
/// collaborators (in-memory store, log-backed event publisher).
pub async fn run(config: Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(
        config.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(LogPublisher),
    );
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    serve(listener, coordinator).await
}

/// Accept loop over an already-bound listener. Split out so tests can
/// bind an ephemeral port first.
pub async fn serve(listener: TcpListener, coordinator: Coordinator) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;

        if coordinator.connection_count().await >= coordinator.config().max_clients {
            warn!(%peer, max_clients = coordinator.config().max_clients,
                "rejecting connection: max clients reached");
            // Dropping the stream closes it.
            continue;
        }

        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            match connection::handle(stream, peer, coordinator).await {
                Ok(()) => debug!(%peer, "connection task finished"),
                Err(err) => debug!(%peer, error = %err, "connection task failed"),
            }
        });
    }
}
