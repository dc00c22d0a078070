//! Process-wide protocol cache
//!
//! Maps a peer host to its negotiated [`Protocol`]. Entries are written at
//! most once and never expire; a peer's protocol is assumed stable for the
//! lifetime of the process.
//!
//! Each host gets its own `OnceCell`, which doubles as a single-flight
//! coordinator: concurrent misses for the same host run exactly one probe,
//! and a failed probe leaves the cell empty so a later call retries.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

use super::Protocol;
use crate::error::Result;

/// Cache of negotiated protocols, keyed by peer host.
///
/// The outer mutex only guards the map itself and is never held across an
/// await point; probe coordination happens on the per-host cell.
#[derive(Default)]
pub struct ProtocolCache {
    peers: Mutex<HashMap<String, Arc<OnceCell<Protocol>>>>,
}

impl ProtocolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously decided protocol for a host, if any
    pub fn lookup(&self, host: &str) -> Option<Protocol> {
        self.peers.lock().get(host).and_then(|cell| cell.get().copied())
    }

    /// Record a decision for a host.
    ///
    /// Idempotent: storing into an already-decided host is a no-op. Decisions
    /// are derived deterministically from a fixed peer configuration, so a
    /// conflicting second store cannot occur under correct use.
    pub fn store(&self, host: &str, protocol: Protocol) {
        let _ = self.cell(host).set(protocol);
    }

    /// Cached decision for a host, probing on a miss.
    ///
    /// At most one probe per host is in flight at a time; every concurrent
    /// caller observes the decision of the probe that won. Probe errors are
    /// propagated and nothing is cached.
    pub async fn resolve<F, Fut>(&self, host: &str, probe: F) -> Result<Protocol>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Protocol>>,
    {
        self.cell(host).get_or_try_init(probe).await.copied()
    }

    fn cell(&self, host: &str) -> Arc<OnceCell<Protocol>> {
        self.peers
            .lock()
            .entry(host.to_string())
            .or_default()
            .clone()
    }
}
