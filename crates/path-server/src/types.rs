//! Shared types for the pathfinding TCP server.
//!
//! This module defines:
//! - `ClientRegistry`: the process-wide count of live sessions
//! - `SessionGuard`: keeps the registry in step with a session's lifetime
//! - `ServerState`: everything a session needs, cloned into each task

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use path_core::PathResolver;
use tokio::sync::watch;

use crate::log_sink::LogHandle;

/// Number of connected clients.
///
/// Every change is published on a watch channel so a status display can
/// follow it. The count is informational; sessions never branch on it.
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    count: AtomicUsize,
    published: watch::Sender<usize>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        let (published, _) = watch::channel(0);
        ClientRegistry {
            inner: Arc::new(RegistryInner {
                count: AtomicUsize::new(0),
                published,
            }),
        }
    }

    /// Returns the count after the increment.
    pub fn increment(&self) -> usize {
        self.update(|count| count.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns the count after the decrement.
    pub fn decrement(&self) -> usize {
        self.update(|count| count.fetch_sub(1, Ordering::SeqCst) - 1)
    }

    pub fn current(&self) -> usize {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Receiver that sees every published count.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.inner.published.subscribe()
    }

    // Mutating inside `send_modify` keeps publish order equal to update order.
    fn update(&self, op: impl FnOnce(&AtomicUsize) -> usize) -> usize {
        let mut after = 0;
        self.inner.published.send_modify(|shown| {
            after = op(&self.inner.count);
            *shown = after;
        });
        after
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts a session in on creation and out on drop, whichever way the
/// session ends.
#[derive(Debug)]
pub struct SessionGuard {
    clients: ClientRegistry,
    peer: SocketAddr,
}

impl SessionGuard {
    pub fn new(clients: ClientRegistry, peer: SocketAddr) -> Self {
        let now = clients.increment();
        tracing::debug!(%peer, clients = now, "session opened");
        SessionGuard { clients, peer }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let now = self.clients.decrement();
        tracing::debug!(peer = %self.peer, clients = now, "session closed");
    }
}

/// Handles shared by every session.
#[derive(Clone)]
pub struct ServerState {
    pub resolver: Arc<PathResolver>,
    pub clients: ClientRegistry,
    pub log: LogHandle,

    /// Reject connections beyond this many live sessions. `0` = no limit.
    pub max_clients: usize,

    /// Longest request line accepted, in bytes.
    pub max_line_length: usize,
}
