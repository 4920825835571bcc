//! Live downstream connection registry.
//!
//! # Responsibilities
//! - Generate unique binding IDs for tracing
//! - Track every live binding and its channel
//! - Close all bindings together on shutdown
//!
//! # Design Decisions
//! - Owned by one server instance and passed explicitly, never global
//! - Entries are removed by a guard, so every exit path unregisters
//! - Closing is cooperative: each binding observes its token and shuts
//!   its own socket

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::observability::metrics;
use crate::routing::Channel;

/// Unique identifier for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BindingId(Uuid);

impl BindingId {
    /// Generate a new unique binding ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct Entry {
    channel: Channel,
    opened_at: Instant,
    close: CancellationToken,
}

/// Snapshot of one live binding.
#[derive(Debug, Clone, Serialize)]
pub struct BindingInfo {
    pub id: BindingId,
    pub channel: Channel,
    pub age_secs: u64,
}

/// Set of live downstream connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    entries: Arc<DashMap<BindingId, Entry>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new binding. It stays registered until the guard drops.
    pub fn register(&self, channel: Channel) -> ConnectionGuard {
        let id = BindingId::new();
        let close = CancellationToken::new();
        self.entries.insert(
            id,
            Entry {
                channel,
                opened_at: Instant::now(),
                close: close.clone(),
            },
        );
        metrics::record_binding_opened(channel);
        tracing::debug!(binding_id = %id, channel = %channel, "Binding registered");

        ConnectionGuard {
            entries: Arc::clone(&self.entries),
            id,
            channel,
            close,
        }
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live bindings per channel; every channel is present, possibly at 0.
    pub fn counts_by_channel(&self) -> BTreeMap<&'static str, usize> {
        let mut counts: BTreeMap<_, _> = Channel::ALL.iter().map(|c| (c.as_str(), 0)).collect();
        for entry in self.entries.iter() {
            *counts.entry(entry.channel.as_str()).or_default() += 1;
        }
        counts
    }

    pub fn snapshot(&self) -> Vec<BindingInfo> {
        let now = Instant::now();
        self.entries
            .iter()
            .map(|entry| BindingInfo {
                id: *entry.key(),
                channel: entry.channel,
                age_secs: now.duration_since(entry.opened_at).as_secs(),
            })
            .collect()
    }

    /// Ask every live binding to close its downstream connection.
    pub fn close_all(&self) {
        for entry in self.entries.iter() {
            entry.close.cancel();
        }
    }

    /// Wait until every binding has unregistered or the timeout elapses.
    /// Returns true if the registry drained.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.entries.is_empty() {
            if Instant::now() >= deadline {
                tracing::warn!(remaining = self.entries.len(), "Bindings still open after drain timeout");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }
}

/// Guard that tracks a binding's lifetime.
/// Unregisters the binding when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    entries: Arc<DashMap<BindingId, Entry>>,
    id: BindingId,
    channel: Channel,
    close: CancellationToken,
}

impl ConnectionGuard {
    /// Get this binding's ID.
    pub fn id(&self) -> BindingId {
        self.id
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Resolves when the registry asks this binding to close.
    pub fn close_requested(&self) -> CancellationToken {
        self.close.clone()
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.entries.remove(&self.id);
        metrics::record_binding_closed(self.channel);
        tracing::debug!(binding_id = %self.id, "Binding unregistered");
    }
}
