//! Error types for connup

use thiserror::Error;

/// Main error type for connup
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TLS error: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),

    #[error("capability probe for peer {host} failed: {source}")]
    ProbeUnreachable {
        host: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected capability status code: {0}")]
    UnexpectedResponse(u16),

    #[error("invalid request target: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Result type alias with connup's Error
pub type Result<T> = std::result::Result<T, Error>;
