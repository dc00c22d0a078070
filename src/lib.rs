//! connup - runtime negotiation between plaintext HTTP and
//! mutually-authenticated HTTPS peers
//!
//! # Architecture
//!
//! ```text
//! Dispatcher ──► ProtocolCache ──[miss]──► Prober ──► peer /connupgrade
//!      │                                                    │
//!      │◄─────────────── decision cached ◄──────────────────┘
//!      ▼
//! GET http://peer:port/...      (Plaintext)
//! GET https://peer:tls_port/... (Secured, mutual TLS)
//! ```
//!
//! The server side binds two listeners concurrently: a plaintext capability
//! listener answering only the probe, and a secured listener enforcing
//! mutual certificate verification in front of the real handlers.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── protocol/        # Protocol decision, cache, capability probe
//! ├── client.rs        # Request dispatcher
//! ├── server/          # Capability + secured listeners, supervisor
//! ├── tls.rs           # Trust material, rustls/reqwest construction
//! ├── config.rs        # JSON configuration
//! └── error.rs         # Unified error types
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tls;

#[cfg(test)]
mod test_pki;

// Re-exports for convenience
pub use client::Dispatcher;
pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{Prober, Protocol, ProtocolCache};
pub use server::Server;
