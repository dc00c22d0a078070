//! Trust material loading and TLS endpoint construction
//!
//! The certificate, private key, and trust pool are read once at startup and
//! are read-only afterwards. The server side turns them into a rustls
//! `ServerConfig` that requires and verifies a client certificate; the
//! client side turns them into the shared `reqwest` client that presents
//! that certificate and trusts the peer's pool.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{RootCertStore, ServerConfig};

use crate::config::{TlsSettings, TrustPool};
use crate::error::{Error, Result};

/// Install the ring crypto provider as the process default.
///
/// Idempotent; must run before any rustls config is built so the server and
/// reqwest stacks agree on one provider.
pub fn install_crypto_provider() {
    let _ = tokio_rustls::rustls::crypto::ring::default_provider().install_default();
}

/// Load a PEM certificate chain from disk
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        Error::Config(format!("Failed to open certificate file {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Config(format!("Failed to parse certificates: {}", e)))?;
    if certs.is_empty() {
        return Err(Error::Config(format!(
            "No certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

/// Load a PEM private key from disk (PKCS#8, PKCS#1, or SEC1)
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| {
        Error::Config(format!("Failed to open key file {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);

    let items = rustls_pemfile::read_all(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Config(format!("Failed to parse private key: {}", e)))?;

    for item in items {
        match item {
            rustls_pemfile::Item::Pkcs8Key(key) => return Ok(PrivateKeyDer::Pkcs8(key)),
            rustls_pemfile::Item::Pkcs1Key(key) => return Ok(PrivateKeyDer::Pkcs1(key)),
            rustls_pemfile::Item::Sec1Key(key) => return Ok(PrivateKeyDer::Sec1(key)),
            _ => continue,
        }
    }

    Err(Error::Config(format!(
        "No valid private key found in {}",
        path.display()
    )))
}

/// Build the secured listener's rustls config.
///
/// Presents the configured certificate and requires a client certificate
/// chaining to the trust pool. With no separate `ca_file` the pool is the
/// server's own certificate, so a peer presenting the same self-signed
/// material is accepted.
pub fn server_config(settings: &TlsSettings) -> Result<Arc<ServerConfig>> {
    let certs = load_certs(&settings.certificate_file)?;
    let key = load_private_key(&settings.key_file)?;

    let mut roots = RootCertStore::empty();
    for cert in load_certs(settings.client_ca())? {
        roots
            .add(cert)
            .map_err(|e| Error::Config(format!("Could not add certificate to the pool: {}", e)))?;
    }

    let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| Error::Config(format!("Failed to build client verifier: {}", e)))?;

    let config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)?;

    Ok(Arc::new(config))
}

/// Build the shared HTTP client.
///
/// With trust material the client presents the certificate/key pair as its
/// identity and extends (or, for a fixed pool, replaces) its root store with
/// the configured pool. Without it the client is a plain HTTP client, good
/// only for plaintext peers and probes.
pub fn http_client(tls: Option<&TlsSettings>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().use_rustls_tls();

    if let Some(settings) = tls {
        let cert_pem = read_pem(&settings.certificate_file)?;
        let key_pem = read_pem(&settings.key_file)?;

        let mut identity_pem = cert_pem;
        identity_pem.extend_from_slice(&key_pem);
        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| Error::Config(format!("Invalid client identity: {}", e)))?;
        builder = builder.identity(identity);

        let ca_pem = read_pem(settings.client_ca())?;
        let ca = reqwest::Certificate::from_pem(&ca_pem)
            .map_err(|e| Error::Config(format!("Invalid trust pool certificate: {}", e)))?;
        builder = builder.add_root_certificate(ca);

        if settings.trust == TrustPool::Fixed {
            builder = builder.tls_built_in_root_certs(false);
        }
    }

    builder
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}
