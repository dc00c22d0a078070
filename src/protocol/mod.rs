//! Protocol negotiation
//!
//! A peer serves its real resources either over plain HTTP or over
//! mutually-authenticated HTTPS on a separate port. Which one is discovered
//! at runtime by probing the peer's plaintext capability endpoint and the
//! answer is memoized per peer host for the lifetime of the process.
//!
//! - [`Protocol`]: the two-variant decision
//! - [`cache::ProtocolCache`]: per-host memoization with single-flight probes
//! - [`probe::Prober`]: the capability probe itself

pub mod cache;
pub mod probe;

pub use cache::ProtocolCache;
pub use probe::{Prober, UPGRADE_PATH};

/// Transport protocol a peer has been classified as using.
///
/// Decided once per peer host and never revised within a process. Every
/// branch on this type matches exhaustively, so a third transport variant
/// would be a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Peer serves its resources over plain HTTP on the plaintext port
    Plaintext,
    /// Peer serves its resources over TLS on the secured port
    Secured,
}

impl Protocol {
    /// URI scheme matching this decision
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Plaintext => "http",
            Protocol::Secured => "https",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Join a host and port into an authority, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
