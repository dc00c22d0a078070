//! Capability listener
//!
//! A plaintext listener that answers exactly one question: does this server
//! keep its real resources behind a secured listener? It serves the
//! well-known upgrade route with a fixed 200 acknowledgement; every other
//! path falls through to the framework's default 404, which is the same
//! answer a peer gives by not running this listener at all.

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::error::Result;
use crate::protocol::UPGRADE_PATH;

/// Fixed acknowledgement body for the capability probe
const UPGRADE_ACK: &str = "ok";

/// Router serving only the capability route
pub fn router() -> Router {
    Router::new().route(UPGRADE_PATH, get(handle_upgrade))
}

/// Declares that this server's main resources are served over TLS
async fn handle_upgrade() -> &'static str {
    UPGRADE_ACK
}

/// Bind the capability listener on the given port and serve until failure
pub async fn serve(port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    info!("Capability listener on port {}", port);
    axum::serve(listener, router()).await?;
    Ok(())
}
