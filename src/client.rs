//! Request dispatcher
//!
//! The dispatcher is the client-side entry point. Given a peer host and a
//! resource path it resolves the peer's protocol (cache first, capability
//! probe on a miss), builds the target URI from the matching scheme/port
//! pair, and sends the request over the shared HTTP client.
//!
//! The client is configured once at startup; when the deployment requires
//! mutual authentication it carries the trust material (see [`crate::tls`]).

use reqwest::Url;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::{join_host_port, Prober, Protocol, ProtocolCache};

/// Dispatches requests to a peer over its negotiated protocol.
///
/// Safe to share across tasks: the cache is internally synchronized and the
/// HTTP client is reference-counted.
pub struct Dispatcher {
    http: reqwest::Client,
    prober: Prober,
    cache: ProtocolCache,
    plaintext_port: u16,
    secured_port: u16,
}

impl Dispatcher {
    /// Build a dispatcher around a shared client and a peer port pair
    pub fn new(http: reqwest::Client, plaintext_port: u16, secured_port: u16) -> Self {
        Self {
            prober: Prober::new(http.clone()),
            http,
            cache: ProtocolCache::new(),
            plaintext_port,
            secured_port,
        }
    }

    /// The protocol cache, exposed for inspection
    pub fn cache(&self) -> &ProtocolCache {
        &self.cache
    }

    /// Send a GET request for `path` to the peer, negotiating the protocol
    /// first if this peer has not been seen before.
    ///
    /// Returns the raw response; interpreting the body is the caller's
    /// responsibility. Probe failures propagate unchanged, transport-level
    /// failures surface as [`Error::Transport`].
    pub async fn request(
        &self,
        host: &str,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response> {
        let protocol = self.resolve_protocol(host).await?;

        let port = match protocol {
            Protocol::Plaintext => self.plaintext_port,
            Protocol::Secured => self.secured_port,
        };
        let target = format!("{}://{}{}", protocol.scheme(), join_host_port(host, port), path);
        let url = Url::parse(&target)
            .map_err(|e| Error::InvalidRequest(format!("{}: {}", target, e)))?;

        debug!("dispatching GET {} ({})", url, protocol);

        let mut request = self.http.get(url);
        if let Some(body) = body {
            request = request.body(body);
        }
        request.send().await.map_err(Error::Transport)
    }

    /// Cached decision for the host, probing on a miss. Concurrent misses
    /// for the same host share a single probe.
    async fn resolve_protocol(&self, host: &str) -> Result<Protocol> {
        self.cache
            .resolve(host, || async {
                info!("no cached protocol for peer {:?}: attempting HTTPS upgrade", host);
                self.prober.probe(host, self.plaintext_port).await
            })
            .await
    }
}
