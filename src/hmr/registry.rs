//! Session Registry
//!
//! Remembers which artifacts each live connection has already received.
//!
//! Entries are keyed by connection id and hold only a `Weak` to the
//! connection: once the transport drops its `Arc<Connection>`, the entry is
//! treated as absent and swept on the next mutation. Per connection, the
//! delivered artifacts keep insertion order, which is also the order the
//! browser observed them in.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::artifact::Artifact;
use super::connection::{Connection, ConnectionId};

struct Entry {
    conn: Weak<Connection>,
    delivered: Vec<Arc<Artifact>>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.conn.strong_count() > 0
    }
}

/// Delivered-artifact bookkeeping for every live connection.
#[derive(Default)]
pub struct SessionRegistry {
    entries: Mutex<FxHashMap<ConnectionId, Entry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `conn` has already received exactly this artifact.
    pub fn has(&self, conn: &Connection, artifact: &Artifact) -> bool {
        let entries = self.entries.lock();
        entries
            .get(&conn.id())
            .filter(|entry| entry.is_live())
            .is_some_and(|entry| entry.delivered.iter().any(|a| a.same_as(artifact)))
    }

    /// Record a delivery. Idempotent: returns `false` if already recorded.
    ///
    /// A new version of an identity already delivered replaces the old one
    /// and moves to the end, so each identity appears at most once.
    pub fn record(&self, conn: &Arc<Connection>, artifact: Arc<Artifact>) -> bool {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.is_live());

        let entry = entries.entry(conn.id()).or_insert_with(|| Entry {
            conn: Arc::downgrade(conn),
            delivered: Vec::new(),
        });

        if entry.delivered.iter().any(|a| a.same_as(&artifact)) {
            return false;
        }

        entry.delivered.retain(|a| a.id() != artifact.id());
        artifact.mark_fresh();
        entry.delivered.push(artifact);
        true
    }

    /// Forget everything delivered to one connection.
    pub fn clear(&self, conn: &Connection) {
        self.entries.lock().remove(&conn.id());
    }

    /// Forget every delivery to every connection (full invalidation).
    ///
    /// Returns the artifacts that were delivered, now marked stale, once each.
    pub fn clear_all(&self) -> Vec<Arc<Artifact>> {
        let mut entries = self.entries.lock();
        let mut stale: Vec<Arc<Artifact>> = Vec::new();
        for (_, entry) in entries.drain() {
            for artifact in entry.delivered {
                if !stale.iter().any(|a| Arc::ptr_eq(a, &artifact)) {
                    artifact.mark_stale();
                    stale.push(artifact);
                }
            }
        }
        stale
    }

    /// Artifacts delivered to `conn`, in delivery order.
    pub fn delivered(&self, conn: &Connection) -> Vec<Arc<Artifact>> {
        let entries = self.entries.lock();
        entries
            .get(&conn.id())
            .filter(|entry| entry.is_live())
            .map(|entry| entry.delivered.clone())
            .unwrap_or_default()
    }

    /// Number of live connections with at least one recorded delivery.
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.is_live());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
