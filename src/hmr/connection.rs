//! Live connection handle.
//!
//! A [`Connection`] is the coordinator-side face of one browser tab's duplex
//! channel. Its identity is the object itself; the numeric id is internal and
//! never sent over the wire. Whoever owns the socket owns the `Arc<Connection>`;
//! everything else (registry, channel) only holds `Weak` references, so the
//! connection's bookkeeping disappears together with the socket.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use super::message::UpdateEvent;

/// Internal, process-unique connection key.
pub type ConnectionId = u64;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Receiving half of a connection: drained by the transport into the socket.
pub type Outbox = mpsc::UnboundedReceiver<UpdateEvent>;

pub struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<UpdateEvent>,
}

impl Connection {
    /// Open a connection, returning the shared handle and its outbox.
    pub fn open() -> (Arc<Self>, Outbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        (Arc::new(Self { id, tx }), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue an event for the transport.
    ///
    /// Returns `false` when the transport side has already gone away.
    pub fn send(&self, event: UpdateEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Whether the transport side is still draining this connection.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let (a, _ra) = Connection::open();
        let (b, _rb) = Connection::open();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_send_after_outbox_dropped() {
        let (conn, mut outbox) = Connection::open();
        assert!(conn.send(UpdateEvent::FullReload));
        assert!(matches!(outbox.try_recv(), Ok(UpdateEvent::FullReload)));

        drop(outbox);
        assert!(!conn.is_open());
        assert!(!conn.send(UpdateEvent::RscReload));
    }
}
