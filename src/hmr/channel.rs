//! Update Event Channel
//!
//! Fan-out point for update events, plus the one-shot "first connection"
//! signal the connection gate waits on.
//!
//! ```text
//!            NoConnection --(first connection)--> Connected
//! ```
//!
//! `Connected` is terminal: later connections are new registry keys, not
//! transitions of this machine.
//!
//! - `full-reload` is transport-only and bypasses the registry. The page
//!   reload opens a new connection with an empty registry entry anyway, so
//!   the "discard all registry state" of a full reload and "bypass the
//!   registry" come to the same thing; existing records are left to expire
//!   with their connections.
//! - `rsc-reload` clears every delivered-artifact record, runs the server-side
//!   reload listeners, then goes out to every live connection.
//! - `module-import` is not accepted here (see [`Broadcast`]); it is pushed
//!   per connection by the gate after deduplication.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use super::connection::Connection;
use super::listeners::{Listener, ReloadListeners, Slot};
use super::message::{Broadcast, UpdateEvent};
use super::registry::SessionRegistry;

/// Resolves once the first connection has been observed.
#[derive(Clone)]
pub struct FirstConnection(watch::Receiver<bool>);

impl FirstConnection {
    pub fn is_open(&self) -> bool {
        *self.0.borrow()
    }

    /// Wait until the first connection arrives (immediately if it already has).
    pub async fn wait(&self) {
        let mut rx = self.0.clone();
        // The sender lives as long as the channel; an error means it is gone
        // and nobody can connect anymore, so there is nothing left to wait for.
        let _ = rx.wait_for(|open| *open).await;
    }
}

pub struct UpdateChannel {
    registry: Arc<SessionRegistry>,
    live: Mutex<Vec<Weak<Connection>>>,
    listeners: Mutex<ReloadListeners>,
    opened: watch::Sender<bool>,
}

impl UpdateChannel {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        let (opened, _) = watch::channel(false);
        Self {
            registry,
            live: Mutex::new(Vec::new()),
            listeners: Mutex::new(ReloadListeners::new()),
            opened,
        }
    }

    /// Subscription point for the first connection event.
    pub fn first_connection(&self) -> FirstConnection {
        FirstConnection(self.opened.subscribe())
    }

    pub fn is_connected(&self) -> bool {
        *self.opened.borrow()
    }

    /// Observe a new connection. The first call opens every waiting gate.
    pub fn connection_opened(&self, conn: &Arc<Connection>) {
        {
            let mut live = self.live.lock();
            live.retain(|weak| weak.strong_count() > 0);
            live.push(Arc::downgrade(conn));
        }

        let first = self.opened.send_if_modified(|open| !std::mem::replace(open, true));
        if first {
            crate::debug!("hmr"; "first connection (#{}), releasing pending deliveries", conn.id());
        } else {
            crate::debug!("hmr"; "connection #{} opened", conn.id());
        }
    }

    /// Observe a closed connection and drop its delivery records.
    pub fn connection_closed(&self, conn: &Connection) {
        self.live
            .lock()
            .retain(|weak| weak.strong_count() > 0 && !std::ptr::eq(weak.as_ptr(), conn));
        self.registry.clear(conn);
    }

    /// Live connections, in the order they were observed.
    pub fn live_connections(&self) -> Vec<Arc<Connection>> {
        let mut live = self.live.lock();
        live.retain(|weak| weak.strong_count() > 0);
        live.iter().filter_map(Weak::upgrade).collect()
    }

    /// Fire-and-forget broadcast to every live connection.
    pub fn send(&self, event: Broadcast) {
        if event == Broadcast::RscReload {
            let stale = self.registry.clear_all();
            crate::debug!("hmr"; "{} delivered artifact(s) now stale", stale.len());
            self.run_listeners();
        }

        let event = UpdateEvent::from(event);
        let targets = self.live_connections();
        let label = event.label();
        for conn in &targets {
            self.push(conn, event.clone());
        }
        crate::debug!("hmr"; "{} sent to {} connection(s)", label, targets.len());
    }

    /// Push one event to one connection.
    pub(super) fn push(&self, conn: &Connection, event: UpdateEvent) {
        let label = event.label();
        if !conn.send(event) {
            crate::debug!("hmr"; "connection #{} closed, dropped {}", conn.id(), label);
        }
    }

    /// Register a server-side reload listener in a named slot.
    pub fn install_listener(&self, slot: Slot, listener: Listener) {
        self.listeners.lock().install(slot, listener);
    }

    fn run_listeners(&self) {
        let snapshot = self.listeners.lock().snapshot();
        for listener in snapshot {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::hmr::artifact::Artifact;

    fn channel() -> (Arc<SessionRegistry>, UpdateChannel) {
        let registry = Arc::new(SessionRegistry::new());
        let channel = UpdateChannel::new(Arc::clone(&registry));
        (registry, channel)
    }

    #[test]
    fn test_first_connection_is_one_shot() {
        let (_, channel) = channel();
        let first = channel.first_connection();
        assert!(!first.is_open());
        assert!(!channel.is_connected());

        let (c1, _o1) = Connection::open();
        channel.connection_opened(&c1);
        assert!(first.is_open());

        let (c2, _o2) = Connection::open();
        channel.connection_opened(&c2);
        assert!(first.is_open());
        assert_eq!(channel.live_connections().len(), 2);
    }

    #[test]
    fn test_full_reload_bypasses_registry() {
        let (registry, channel) = channel();
        let (conn, mut outbox) = Connection::open();
        channel.connection_opened(&conn);

        let a = Arc::new(Artifact::stylesheet("/a.css", "", "a{}"));
        registry.record(&conn, a.clone());

        channel.send(Broadcast::FullReload);
        assert!(matches!(outbox.try_recv(), Ok(UpdateEvent::FullReload)));
        assert!(registry.has(&conn, &a));
    }

    #[test]
    fn test_rsc_reload_clears_and_runs_listeners() {
        let (registry, channel) = channel();
        let (c1, mut o1) = Connection::open();
        let (c2, mut o2) = Connection::open();
        channel.connection_opened(&c1);
        channel.connection_opened(&c2);

        let a = Arc::new(Artifact::stylesheet("/a.css", "", "a{}"));
        registry.record(&c1, a.clone());
        registry.record(&c2, a.clone());

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        channel.install_listener(
            Slot::Fragment,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        channel.send(Broadcast::RscReload);

        assert!(!registry.has(&c1, &a));
        assert!(!registry.has(&c2, &a));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(o1.try_recv(), Ok(UpdateEvent::RscReload)));
        assert!(matches!(o2.try_recv(), Ok(UpdateEvent::RscReload)));
    }

    #[test]
    fn test_dropped_connection_not_targeted() {
        let (_, channel) = channel();
        let (c1, mut o1) = Connection::open();
        let (c2, _o2) = Connection::open();
        channel.connection_opened(&c1);
        channel.connection_opened(&c2);
        drop(c2);

        channel.send(Broadcast::HotImport("/app.js".into()));
        assert_eq!(channel.live_connections().len(), 1);
        match o1.try_recv() {
            Ok(UpdateEvent::HotImport(path)) => assert_eq!(path, "/app.js"),
            other => panic!("expected hot-import, got {other:?}"),
        }
    }
}
