//! Configuration module for connup
//!
//! JSON configuration in the same spirit as the flag surface of the
//! original deployment: a client block naming the peer and its port pair, a
//! server block naming the local port pair, and an optional TLS block with
//! the trust material. A server config without a TLS block runs the
//! plaintext-only variant.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default plaintext port
pub const DEFAULT_PLAINTEXT_PORT: u16 = 8080;
/// Default secured port
pub const DEFAULT_SECURED_PORT: u16 = 443;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log configuration
    #[serde(default)]
    pub log: LogConfig,

    /// Peer to dispatch requests to (client side)
    #[serde(default)]
    pub peer: Option<PeerConfig>,

    /// Local listeners (server side)
    #[serde(default)]
    pub listen: Option<ListenConfig>,

    /// Trust material; required for the secured listener and for a client
    /// talking to secured peers
    #[serde(default)]
    pub tls: Option<TlsSettings>,
}

/// Log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Remote peer a client dispatches to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Peer hostname; also the protocol-cache key
    pub host: String,

    /// Peer's plaintext port (capability probe, plaintext resources)
    #[serde(default = "default_plaintext_port")]
    pub port: u16,

    /// Peer's secured port
    #[serde(default = "default_secured_port")]
    pub tls_port: u16,
}

/// Local listener ports for a server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Plaintext port (capability listener, or the whole plaintext-only
    /// server)
    #[serde(default = "default_plaintext_port")]
    pub port: u16,

    /// Secured listener port
    #[serde(default = "default_secured_port")]
    pub tls_port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            port: default_plaintext_port(),
            tls_port: default_secured_port(),
        }
    }
}

fn default_plaintext_port() -> u16 {
    DEFAULT_PLAINTEXT_PORT
}

fn default_secured_port() -> u16 {
    DEFAULT_SECURED_PORT
}

/// Trust material paths and trust pool source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsSettings {
    /// Path to the PEM certificate (presented by server and client alike)
    pub certificate_file: PathBuf,

    /// Path to the PEM private key
    pub key_file: PathBuf,

    /// Path to the trusted CA pool; defaults to `certificate_file`, which
    /// matches a self-signed deployment where the certificate is its own
    /// authority
    #[serde(default)]
    pub ca_file: Option<PathBuf>,

    /// Trust pool source for outgoing connections
    #[serde(default)]
    pub trust: TrustPool,
}

impl TlsSettings {
    /// Pool used to verify the other side's certificate
    pub fn client_ca(&self) -> &Path {
        self.ca_file.as_deref().unwrap_or(&self.certificate_file)
    }
}

/// Where the trusted root pool comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustPool {
    /// Built-in roots extended with the configured certificate
    #[default]
    System,
    /// Only the configured pool is trusted
    Fixed,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Create a default client configuration
    pub fn default_client() -> Self {
        Config {
            log: LogConfig::default(),
            peer: Some(PeerConfig {
                host: "localhost".to_string(),
                port: DEFAULT_PLAINTEXT_PORT,
                tls_port: DEFAULT_SECURED_PORT,
            }),
            listen: None,
            tls: Some(TlsSettings {
                certificate_file: PathBuf::from("ssl/server.crt"),
                key_file: PathBuf::from("ssl/server.key"),
                ca_file: None,
                trust: TrustPool::System,
            }),
        }
    }

    /// Create a default dual-listener server configuration
    pub fn default_server() -> Self {
        Config {
            log: LogConfig::default(),
            peer: None,
            listen: Some(ListenConfig::default()),
            tls: Some(TlsSettings {
                certificate_file: PathBuf::from("ssl/server.crt"),
                key_file: PathBuf::from("ssl/server.key"),
                ca_file: None,
                trust: TrustPool::Fixed,
            }),
        }
    }

    /// Create a default plaintext-only server configuration
    pub fn default_plain_server() -> Self {
        Config {
            log: LogConfig::default(),
            peer: None,
            listen: Some(ListenConfig::default()),
            tls: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let client = Config::default_client();
        assert!(client.peer.is_some());
        assert!(client.listen.is_none());

        let server = Config::default_server();
        assert!(server.listen.is_some());
        assert!(server.tls.is_some());

        let plain = Config::default_plain_server();
        assert!(plain.tls.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_server();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = Config::from_json(&json).unwrap();
        assert_eq!(
            parsed.listen.unwrap().tls_port,
            config.listen.unwrap().tls_port
        );
    }

    #[test]
    fn test_port_defaults() {
        let config = Config::from_json(r#"{"peer": {"host": "example.com"}}"#).unwrap();
        let peer = config.peer.unwrap();
        assert_eq!(peer.port, 8080);
        assert_eq!(peer.tls_port, 443);
    }

    #[test]
    fn test_trust_pool_parsing() {
        let config = Config::from_json(
            r#"{
                "tls": {
                    "certificate_file": "ssl/server.crt",
                    "key_file": "ssl/server.key",
                    "trust": "fixed"
                }
            }"#,
        )
        .unwrap();
        let tls = config.tls.unwrap();
        assert_eq!(tls.trust, TrustPool::Fixed);
        assert_eq!(tls.client_ca(), Path::new("ssl/server.crt"));
    }

    #[test]
    fn test_malformed_config_is_a_config_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
