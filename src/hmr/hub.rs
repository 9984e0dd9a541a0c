//! `Hmr` facade: one coordinator instance per dev server.
//!
//! Owns the session registry and wires the channel, gate and planner around
//! it. The registry is written only by the gate (`record`) and the channel
//! (`clear`, `clear_all`).

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use parking_lot::Mutex;

use super::artifact::Artifact;
use super::channel::UpdateChannel;
use super::connection::Connection;
use super::gate::ConnectionGate;
use super::listeners::{Listener, Slot};
use super::message::Broadcast;
use super::planner::{InjectableElement, InjectionPlanner, inject_html};
use super::registry::SessionRegistry;
use crate::config::ClientConfig;
use crate::embed::runtime_element;

pub struct Hmr {
    registry: Arc<SessionRegistry>,
    channel: Arc<UpdateChannel>,
    gate: ConnectionGate,
    planner: InjectionPlanner,
    /// Everything imported since the last `rsc-reload`, one entry per identity,
    /// in import order. Replayed to connections that open later.
    pending: Mutex<Vec<Arc<Artifact>>>,
    id_attr: String,
    ws_port: AtomicU16,
}

impl Hmr {
    pub fn new(client: &ClientConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let channel = Arc::new(UpdateChannel::new(Arc::clone(&registry)));
        let gate = ConnectionGate::new(Arc::clone(&registry), Arc::clone(&channel));
        let planner = InjectionPlanner::new(
            Arc::clone(&registry),
            client.script.clone(),
            client.id_attr.clone(),
        );
        Self {
            registry,
            channel,
            gate,
            planner,
            pending: Mutex::new(Vec::new()),
            id_attr: client.id_attr.clone(),
            ws_port: AtomicU16::new(0),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn channel(&self) -> &UpdateChannel {
        &self.channel
    }

    pub fn gate(&self) -> &ConnectionGate {
        &self.gate
    }

    /// Record the port the WebSocket server actually bound.
    pub fn set_ws_port(&self, port: u16) {
        self.ws_port.store(port, Ordering::Relaxed);
    }

    pub fn ws_port(&self) -> u16 {
        self.ws_port.load(Ordering::Relaxed)
    }

    /// Imported artifacts not yet voided by an `rsc-reload`, in import order.
    pub fn pending(&self) -> Vec<Arc<Artifact>> {
        self.pending.lock().clone()
    }

    /// Announce a new live connection and replay the pending set to it.
    pub async fn connect(&self, conn: &Arc<Connection>) {
        self.channel.connection_opened(conn);
        for artifact in self.pending() {
            self.gate.deliver(conn, artifact).await;
        }
    }

    /// Forget a closed connection's deliveries.
    pub fn disconnect(&self, conn: &Connection) {
        self.channel.connection_closed(conn);
    }

    /// Deliver `artifact` to every live connection and keep it pending for
    /// connections that open later.
    ///
    /// Suspends until the first connection exists.
    pub async fn import(&self, artifact: Arc<Artifact>) {
        {
            let mut pending = self.pending.lock();
            pending.retain(|a| a.id() != artifact.id());
            pending.push(Arc::clone(&artifact));
        }

        self.gate.opened().await;
        for conn in self.channel.live_connections() {
            self.gate.deliver(&conn, Arc::clone(&artifact)).await;
        }
    }

    pub fn full_reload(&self) {
        self.channel.send(Broadcast::FullReload);
    }

    /// Void every delivery and tell clients to refetch fragments.
    ///
    /// Returns the artifacts that were pending, now stale, in import order.
    /// Clients have just removed their elements, so callers rebuild and
    /// import them again after this returns.
    pub fn rsc_reload(&self) -> Vec<Arc<Artifact>> {
        let voided = std::mem::take(&mut *self.pending.lock());
        for artifact in &voided {
            artifact.mark_stale();
        }
        self.channel.send(Broadcast::RscReload);
        voided
    }

    pub fn hot_import(&self, path: impl Into<String>) {
        self.channel.send(Broadcast::HotImport(path.into()));
    }

    /// Run `listener` on every `rsc-reload`, replacing any previous one in `slot`.
    pub fn on_reload(&self, slot: Slot, listener: Listener) {
        self.channel.install_listener(slot, listener);
    }

    /// Everything an initial page render needs: the client runtime, then the
    /// injection plan.
    ///
    /// A page rendered for a known connection gets that connection's delivered
    /// set; a fresh page load (no socket yet) gets the pending set.
    pub fn initial_elements(&self, conn: Option<&Connection>) -> Vec<InjectableElement> {
        let mut elements = vec![runtime_element(self.ws_port(), &self.id_attr)];
        match conn {
            Some(conn) => elements.extend(self.planner.plan(conn)),
            None => elements.extend(self.planner.plan_artifacts(&self.pending())),
        }
        elements
    }

    /// Splice [`Self::initial_elements`] into a rendered page.
    pub fn render_page(&self, html: &str, conn: Option<&Connection>) -> String {
        inject_html(html, &self.initial_elements(conn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmr::connection::Outbox;
    use crate::hmr::message::UpdateEvent;
    use crate::hmr::planner::InjectTo;

    fn hmr() -> Hmr {
        Hmr::new(&ClientConfig::default())
    }

    fn css(id: &str, body: &str) -> Arc<Artifact> {
        Arc::new(Artifact::stylesheet(id, format!("/*{body}*/"), body))
    }

    fn drain(outbox: &mut Outbox) -> Vec<String> {
        let mut events = Vec::new();
        while let Ok(event) = outbox.try_recv() {
            match event {
                UpdateEvent::ModuleImport(a) => events.push(format!("module-import {}", a.id())),
                other => events.push(other.label().to_string()),
            }
        }
        events
    }

    #[tokio::test]
    async fn test_import_reaches_every_live_connection_once() {
        let hmr = hmr();
        let (c1, mut o1) = Connection::open();
        let (c2, mut o2) = Connection::open();
        hmr.connect(&c1).await;
        hmr.connect(&c2).await;

        let a = css("/a.css", "a{}");
        hmr.import(Arc::clone(&a)).await;
        hmr.import(Arc::clone(&a)).await;

        for outbox in [&mut o1, &mut o2] {
            assert_eq!(drain(outbox), vec!["module-import /a.css"]);
        }
        assert_eq!(hmr.registry().len(), 2);

        hmr.disconnect(&c1);
        assert_eq!(hmr.registry().len(), 1);
        assert!(!hmr.registry().has(&c1, &a));
        assert_eq!(hmr.channel().live_connections().len(), 1);
    }

    #[tokio::test]
    async fn test_import_waits_for_first_connection() {
        let hmr = Arc::new(hmr());
        let pending = tokio::spawn({
            let hmr = Arc::clone(&hmr);
            async move { hmr.import(css("/a.css", "a{}")).await }
        });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        let (conn, mut outbox) = Connection::open();
        hmr.connect(&conn).await;
        pending.await.unwrap();

        assert_eq!(drain(&mut outbox), vec!["module-import /a.css"]);
    }

    #[tokio::test]
    async fn test_late_connection_receives_earlier_imports() {
        let hmr = hmr();
        let (c1, _o1) = Connection::open();
        hmr.connect(&c1).await;
        hmr.import(css("/a.css", "a{}")).await;
        hmr.import(css("/b.css", "b{}")).await;

        let (c2, mut o2) = Connection::open();
        hmr.connect(&c2).await;
        assert_eq!(drain(&mut o2), vec!["module-import /a.css", "module-import /b.css"]);

        let plan = hmr.initial_elements(Some(&c2));
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[1].get_attr("data-hmr-module-id"), Some("/a.css"));
    }

    #[tokio::test]
    async fn test_import_with_no_live_tab_is_kept() {
        let hmr = hmr();
        let (c1, o1) = Connection::open();
        hmr.connect(&c1).await;
        hmr.disconnect(&c1);
        drop((c1, o1));

        // Gate already open, nobody to deliver to
        hmr.import(css("/b.css", "b{}")).await;

        let page = hmr.initial_elements(None);
        assert_eq!(page.len(), 2);
        assert_eq!(page[1].get_attr("data-hmr-module-id"), Some("/b.css"));

        let (c3, mut o3) = Connection::open();
        hmr.connect(&c3).await;
        assert_eq!(drain(&mut o3), vec!["module-import /b.css"]);
    }

    #[tokio::test]
    async fn test_new_version_replaces_pending_entry() {
        let hmr = hmr();
        let (conn, _outbox) = Connection::open();
        hmr.connect(&conn).await;
        hmr.import(css("/a.css", "a{color:red}")).await;
        hmr.import(css("/b.css", "b{}")).await;
        hmr.import(css("/a.css", "a{color:blue}")).await;

        let ids: Vec<_> = hmr.pending().iter().map(|a| a.raw_source().to_string()).collect();
        assert_eq!(ids, vec!["b{}", "a{color:blue}"]);
    }

    #[tokio::test]
    async fn test_rsc_reload_voids_pending_and_returns_it() {
        let hmr = hmr();
        let (conn, mut outbox) = Connection::open();
        hmr.connect(&conn).await;
        let a = css("/a.css", "a{}");
        hmr.import(Arc::clone(&a)).await;

        let voided = hmr.rsc_reload();
        assert_eq!(voided.len(), 1);
        assert!(voided[0].is_stale());
        assert!(hmr.pending().is_empty());
        assert!(hmr.registry().is_empty());

        hmr.import(Arc::clone(&a)).await;
        assert!(!a.is_stale());
        assert_eq!(
            drain(&mut outbox),
            vec!["module-import /a.css", "rsc-reload", "module-import /a.css"]
        );
    }

    #[tokio::test]
    async fn test_render_page_includes_runtime_and_plan() {
        let hmr = hmr();
        hmr.set_ws_port(24680);
        let (conn, _outbox) = Connection::open();
        hmr.connect(&conn).await;
        hmr.import(css("/a.css", "a{color:red}")).await;

        let elements = hmr.initial_elements(Some(&conn));
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].inject_to, InjectTo::Head);
        assert!(elements[0].children.contains("24680"));
        assert_eq!(elements[1].tag, "style");

        let page = hmr.render_page("<html><head></head><body></body></html>", Some(&conn));
        assert!(page.contains("<style data-hmr-module-id=\"/a.css\">a{color:red}</style></body>"));
    }

    #[test]
    fn test_fresh_page_gets_runtime_only() {
        assert_eq!(hmr().initial_elements(None).len(), 1);
    }
}
