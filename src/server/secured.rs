//! Secured listener
//!
//! Terminates TLS with mutual authentication and serves the application
//! router to peers that pass handshake verification. Per connection the
//! lifecycle is accept → handshake → serve (or handshake failure → close);
//! a rejected client certificate never reaches a handler and is never
//! retried by the server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use tower_service::Service;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Bind the secured listener on the given port and serve until failure
pub async fn serve(port: u16, tls: Arc<ServerConfig>, app: Router) -> Result<()> {
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    info!("Secured listener on port {}", port);
    serve_on(listener, tls, app).await
}

/// Accept loop over an already-bound listener.
///
/// Each connection is handled in its own task; an accept error is fatal and
/// propagates to the supervisor.
pub(crate) async fn serve_on(
    listener: TcpListener,
    tls: Arc<ServerConfig>,
    app: Router,
) -> Result<()> {
    let acceptor = TlsAcceptor::from(tls);

    loop {
        let (stream, peer) = listener.accept().await?;
        let acceptor = acceptor.clone();
        let app = app.clone();
        tokio::spawn(async move {
            handle_connection(acceptor, stream, peer, app).await;
        });
    }
}

async fn handle_connection(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    peer: SocketAddr,
    app: Router,
) {
    // Handshake first; client-certificate verification happens here, so a
    // rejected peer is dropped before any handler runs
    let tls_stream = match acceptor.accept(stream).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("TLS handshake with {} failed: {}", peer, e);
            return;
        }
    };

    let service =
        service_fn(move |request: Request<Incoming>| app.clone().call(request.map(Body::new)));

    if let Err(e) = auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(tls_stream), service)
        .await
    {
        debug!("Connection with {} ended: {}", peer, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    use crate::client::Dispatcher;
    use crate::error::Error;
    use crate::protocol::Protocol;
    use crate::server::capability;
    use crate::test_pki::TestPki;
    use crate::tls;

    /// Dual-listener peer: capability endpoint on one ephemeral port,
    /// mutually-authenticated resources on another
    async fn spawn_secured_peer(pki: &TestPki) -> (u16, u16) {
        tls::install_crypto_provider();

        let cap = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let cap_port = cap.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(cap, capability::router()).await.unwrap();
        });

        let sec = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let sec_port = sec.local_addr().unwrap().port();
        let config = tls::server_config(&pki.server).unwrap();
        let app = Router::new().route("/ping", get(|| async { "https pong" }));
        tokio::spawn(async move {
            serve_on(sec, config, app).await.unwrap();
        });

        (cap_port, sec_port)
    }

    #[tokio::test]
    async fn test_mutually_authenticated_dispatch() {
        let pki = TestPki::generate();
        let (cap_port, sec_port) = spawn_secured_peer(&pki).await;

        let http = tls::http_client(Some(&pki.client)).unwrap();
        let dispatcher = Dispatcher::new(http, cap_port, sec_port);

        let response = dispatcher
            .request("localhost", "/ping", None)
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), "https pong");
        assert_eq!(
            dispatcher.cache().lookup("localhost"),
            Some(Protocol::Secured)
        );

        // Second dispatch rides the cache and lands on the same listener
        let response = dispatcher
            .request("localhost", "/ping", None)
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "https pong");
    }

    #[tokio::test]
    async fn test_client_without_certificate_is_rejected() {
        let pki = TestPki::generate();
        let (cap_port, sec_port) = spawn_secured_peer(&pki).await;

        // Trusts the server's CA but presents no identity
        let ca_pem = std::fs::read(pki.client.ca_file.as_ref().unwrap()).unwrap();
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .add_root_certificate(reqwest::Certificate::from_pem(&ca_pem).unwrap())
            .tls_built_in_root_certs(false)
            .build()
            .unwrap();

        let dispatcher = Dispatcher::new(http, cap_port, sec_port);
        let err = dispatcher
            .request("localhost", "/ping", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        // The listener survives the rejection; a proper peer still gets in
        let http = tls::http_client(Some(&pki.client)).unwrap();
        let dispatcher = Dispatcher::new(http, cap_port, sec_port);
        let response = dispatcher
            .request("localhost", "/ping", None)
            .await
            .unwrap();
        assert_eq!(response.text().await.unwrap(), "https pong");
    }

    #[tokio::test]
    async fn test_untrusted_client_certificate_is_rejected() {
        let pki = TestPki::generate();
        let (cap_port, sec_port) = spawn_secured_peer(&pki).await;

        let rogue = pki.untrusted_client();
        let http = tls::http_client(Some(&rogue)).unwrap();
        let dispatcher = Dispatcher::new(http, cap_port, sec_port);

        let err = dispatcher
            .request("localhost", "/ping", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
