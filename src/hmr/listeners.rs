//! Reload listeners.
//!
//! An ordered list of callbacks run on every `rsc-reload`, with two named
//! singleton slots:
//!
//! - [`Slot::Fragment`]: re-registration replaces the previous fragment
//!   listener in place; a first registration is appended.
//! - [`Slot::Route`]: re-registration replaces in place; a first
//!   registration goes to the front, so route refetch runs before any
//!   generic fragment refetch.
//!
//! The browser runtime keeps the same structure in global state
//! (see [`Slot::install_js`]); the server side keeps its own instance for
//! caches that must be dropped together with the client's fragments.

use std::sync::Arc;

/// Reload callback.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Global holding the client-side listener array.
pub const LISTENERS_GLOBAL: &str = "__HMR_RELOAD_LISTENERS__";

/// A named singleton position in the listener list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Fragment,
    Route,
}

impl Slot {
    /// Client global holding the current function of this slot.
    pub fn global(self) -> &'static str {
        match self {
            Self::Fragment => "__HMR_REFETCH_FRAGMENT__",
            Self::Route => "__HMR_REFETCH_ROUTE__",
        }
    }

    /// Array method used for a first registration.
    fn first_insert_js(self) -> &'static str {
        match self {
            Self::Fragment => "push",
            Self::Route => "unshift",
        }
    }

    /// Client code registering the function bound to `local` into this slot.
    pub fn install_js(self, local: &str) -> String {
        let list = LISTENERS_GLOBAL;
        let current = self.global();
        let insert = self.first_insert_js();
        format!(
            "const __hmrListeners = (globalThis.{list} ||= []);\n\
             const __hmrIndex = __hmrListeners.indexOf(globalThis.{current});\n\
             if (__hmrIndex !== -1) {{ __hmrListeners.splice(__hmrIndex, 1, {local}); }} \
             else {{ __hmrListeners.{insert}({local}); }}\n\
             globalThis.{current} = {local};\n"
        )
    }
}

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ListenerKey(u64);

#[derive(Default)]
pub struct ReloadListeners {
    list: Vec<(ListenerKey, Listener)>,
    fragment: Option<ListenerKey>,
    route: Option<ListenerKey>,
    next: u64,
}

impl ReloadListeners {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(&mut self) -> ListenerKey {
        self.next += 1;
        ListenerKey(self.next)
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<ListenerKey> {
        match slot {
            Slot::Fragment => &mut self.fragment,
            Slot::Route => &mut self.route,
        }
    }

    /// Install `listener` as the current function of `slot`.
    pub fn install(&mut self, slot: Slot, listener: Listener) {
        let key = self.key();
        let current = *self.slot_mut(slot);
        let position = current.and_then(|old| self.list.iter().position(|(k, _)| *k == old));

        match (position, slot) {
            (Some(index), _) => self.list[index] = (key, listener),
            (None, Slot::Fragment) => self.list.push((key, listener)),
            (None, Slot::Route) => self.list.insert(0, (key, listener)),
        }

        *self.slot_mut(slot) = Some(key);
    }

    /// Snapshot of the listeners in invocation order.
    ///
    /// Callers run the snapshot outside any lock guarding this list.
    pub fn snapshot(&self) -> Vec<Listener> {
        self.list.iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Listener {
        let log = Arc::clone(log);
        Arc::new(move || log.lock().push(name))
    }

    fn run(listeners: &ReloadListeners) {
        for listener in listeners.snapshot() {
            listener();
        }
    }

    #[test]
    fn test_fragment_slot_replaces_not_appends() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = ReloadListeners::new();

        listeners.install(Slot::Route, recorder(&log, "route"));
        listeners.install(Slot::Fragment, recorder(&log, "fragment-v1"));
        listeners.install(Slot::Fragment, recorder(&log, "fragment-v2"));

        assert_eq!(listeners.len(), 2);
        run(&listeners);
        assert_eq!(*log.lock(), vec!["route", "fragment-v2"]);
    }

    #[test]
    fn test_route_slot_goes_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = ReloadListeners::new();

        listeners.install(Slot::Fragment, recorder(&log, "fragment"));
        listeners.install(Slot::Route, recorder(&log, "route-v1"));
        listeners.install(Slot::Route, recorder(&log, "route-v2"));

        assert_eq!(listeners.len(), 2);
        run(&listeners);
        assert_eq!(*log.lock(), vec!["route-v2", "fragment"]);
    }

    #[test]
    fn test_install_js_mentions_slot_semantics() {
        let js = Slot::Fragment.install_js("refetch");
        assert!(js.contains("globalThis.__HMR_RELOAD_LISTENERS__ ||= []"));
        assert!(js.contains("__hmrListeners.push(refetch)"));
        assert!(js.contains("globalThis.__HMR_REFETCH_FRAGMENT__ = refetch;"));

        let js = Slot::Route.install_js("refetch");
        assert!(js.contains("__hmrListeners.unshift(refetch)"));
        assert!(js.contains("splice(__hmrIndex, 1, refetch)"));
    }
}
