//! Server side: dual-listener exposure
//!
//! A secured deployment binds two listeners concurrently: the plaintext
//! capability listener, which only ever answers the upgrade probe, and the
//! secured listener, which terminates mutually-authenticated TLS and serves
//! the real handlers. A deployment without trust material runs a single
//! plaintext listener serving the handlers directly; such a peer answers
//! probes with 404 simply by having no capability route.

pub mod capability;
pub mod secured;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio_rustls::rustls::ServerConfig;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::tls;

/// Application resource handlers, served behind whichever transport the
/// deployment uses
pub fn app_router(pong: &'static str) -> Router {
    Router::new().route("/ping", get(move || async move { pong }))
}

/// Server built from configuration
#[derive(Debug)]
pub struct Server {
    plaintext_port: u16,
    secured: Option<(Arc<ServerConfig>, u16)>,
}

impl Server {
    /// Build the server, loading trust material if the deployment is
    /// secured. Unreadable material is a fatal configuration error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let listen = config.listen.clone().unwrap_or_default();
        let secured = match &config.tls {
            Some(settings) => Some((tls::server_config(settings)?, listen.tls_port)),
            None => None,
        };
        Ok(Self {
            plaintext_port: listen.port,
            secured,
        })
    }

    /// Run until a listener fails.
    ///
    /// The two listeners are independent tasks sharing one process
    /// lifetime: a fatal error on either accept loop fails the join and
    /// takes the process with it.
    pub async fn run(&self) -> Result<()> {
        match &self.secured {
            Some((tls_config, tls_port)) => {
                tokio::try_join!(
                    capability::serve(self.plaintext_port),
                    secured::serve(*tls_port, tls_config.clone(), app_router("https pong")),
                )?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(SocketAddr::from((
                    [0, 0, 0, 0],
                    self.plaintext_port,
                )))
                .await?;
                info!("Serving plaintext on port {}", self.plaintext_port);
                axum::serve(listener, app_router("http pong")).await?;
            }
        }
        Ok(())
    }
}
