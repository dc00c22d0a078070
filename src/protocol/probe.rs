//! Capability probe
//!
//! The probe is a plaintext GET against a peer's well-known capability
//! endpoint. It is intentionally minimal: the decision is carried entirely
//! by the status code, so a peer implements the listener side with a single
//! fixed-response route, or not at all.

use reqwest::StatusCode;

use super::{join_host_port, Protocol};
use crate::error::{Error, Result};

/// Well-known path of the capability endpoint
pub const UPGRADE_PATH: &str = "/connupgrade";

/// Issues capability probes over a shared HTTP client.
///
/// The probe always travels over plain HTTP; the client's TLS material is
/// simply unused on this hop.
#[derive(Clone)]
pub struct Prober {
    http: reqwest::Client,
}

impl Prober {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Classify a peer by probing its capability endpoint.
    ///
    /// - 404: the peer never implemented the upgrade path; its resources are
    ///   assumed plaintext on the same kind of port.
    /// - 200: the peer declares a secured listener on its secured port.
    /// - anything else is a protocol violation and nothing is decided.
    pub async fn probe(&self, host: &str, plaintext_port: u16) -> Result<Protocol> {
        let url = format!(
            "http://{}{}",
            join_host_port(host, plaintext_port),
            UPGRADE_PATH
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| Error::ProbeUnreachable {
                host: host.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(Protocol::Plaintext),
            StatusCode::OK => Ok(Protocol::Secured),
            other => Err(Error::UnexpectedResponse(other.as_u16())),
        }
    }
}
