//! Connection Gate
//!
//! Sequences and deduplicates `module-import` deliveries.
//!
//! The transform layer can produce artifacts before any browser has finished
//! its WebSocket handshake. Such deliveries suspend on the channel's one-shot
//! first-connection signal and resume, in call order, once it fires. After
//! that every delivery proceeds immediately.
//!
//! Call order is kept by a fair turn lock taken *before* waiting: tokio's
//! mutex queues waiters FIFO, so deliveries issued before the first
//! connection are replayed in the order they were issued.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::artifact::Artifact;
use super::channel::{FirstConnection, UpdateChannel};
use super::connection::Connection;
use super::message::UpdateEvent;
use super::registry::SessionRegistry;

pub struct ConnectionGate {
    registry: Arc<SessionRegistry>,
    channel: Arc<UpdateChannel>,
    first: FirstConnection,
    turn: Mutex<()>,
}

impl ConnectionGate {
    pub fn new(registry: Arc<SessionRegistry>, channel: Arc<UpdateChannel>) -> Self {
        let first = channel.first_connection();
        Self {
            registry,
            channel,
            first,
            turn: Mutex::new(()),
        }
    }

    /// Whether the first connection has been observed.
    pub fn is_open(&self) -> bool {
        self.first.is_open()
    }

    /// Wait for the first connection (no-op once it has been observed).
    pub async fn opened(&self) {
        self.first.wait().await;
    }

    /// Deliver `artifact` to `conn` at most once.
    ///
    /// Never fails: transport problems belong to the transport.
    pub async fn deliver(&self, conn: &Arc<Connection>, artifact: Arc<Artifact>) {
        let _turn = self.turn.lock().await;

        if !self.first.is_open() {
            crate::debug!("gate"; "holding {} until a client connects", artifact.id());
            self.first.wait().await;
        }

        let redelivery = artifact.is_stale();
        if !self.registry.record(conn, Arc::clone(&artifact)) {
            crate::debug!("gate"; "skip {} ({}) for #{}: already delivered",
                artifact.id(), artifact.fingerprint(), conn.id());
            return;
        }

        crate::debug!("gate"; "{} {} ({}) to #{}",
            if redelivery { "redeliver" } else { "deliver" },
            artifact.id(), artifact.kind().label(), conn.id());
        self.channel.push(conn, UpdateEvent::ModuleImport(artifact));
    }
}
