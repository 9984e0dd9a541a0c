//! Source Patch Injector
//!
//! Rewrites two generated client modules at transform time so that an
//! `rsc-reload` can refetch server fragments in place:
//!
//! - the fragment-fetch module gets a "refetch all fragments" closure,
//!   registered in the fragment slot (replace, else append);
//! - the router module gets a "refetch current route" closure, registered in
//!   the route slot (replace, else prepend).
//!
//! Both are located by a marker regex matching the start of a function body
//! in the generated output. Patching is best effort: a module without its
//! marker is passed through byte for byte.

use std::borrow::Cow;

use regex::Regex;

use super::listeners::Slot;
use crate::config::PatchConfig;

/// A rewrite for one family of modules.
pub trait PatchStrategy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Whether this strategy applies to `module_id`.
    fn matches(&self, module_id: &str) -> bool;

    /// Rewritten code, or `None` when the module does not have the expected shape.
    fn apply(&self, code: &str) -> Option<String>;
}

/// Refetch closure body for the fragment-fetch module.
///
/// Runs in the scope of the fetch function: drops the cached entry for the
/// current path, fetches again and applies the fresh elements.
pub const FRAGMENT_REFETCH_BODY: &str = "\
    delete cache[ENTRY];\n\
    const data = fetchRsc(rscPath, rscParams, prefetchOnly, setElements, cache);\n\
    setElements(data);\n";

/// Refetch closure body for the router module.
///
/// Runs in the router component scope: forgets which route segments are
/// cached and refetches the current route.
pub const ROUTE_REFETCH_BODY: &str = "\
    staticPathSetRef.current.clear();\n\
    cachedIdSetRef.current.clear();\n\
    const rscPath = encodeRoutePath(route.path);\n\
    const rscParams = createRscParams(route.query, []);\n\
    refetch(rscPath, rscParams);\n";

/// Insert a refetch closure right after a marker.
pub struct MarkerPatch {
    name: String,
    module_suffix: String,
    marker: Regex,
    slot: Slot,
    body: String,
}

impl MarkerPatch {
    pub fn new(
        name: impl Into<String>,
        module_suffix: impl Into<String>,
        marker: Regex,
        slot: Slot,
        body: impl Into<String>,
    ) -> Self {
        let module_suffix: String = module_suffix.into();
        Self {
            name: name.into(),
            module_suffix: module_suffix.trim_start_matches('/').to_string(),
            marker,
            slot,
            body: body.into(),
        }
    }

    /// Patch for the fragment-fetch module.
    pub fn fragment(module_suffix: impl Into<String>, marker: Regex) -> Self {
        Self::new(
            "fragment",
            module_suffix,
            marker,
            Slot::Fragment,
            FRAGMENT_REFETCH_BODY,
        )
    }

    /// Patch for the router module.
    pub fn router(module_suffix: impl Into<String>, marker: Regex) -> Self {
        Self::new("route", module_suffix, marker, Slot::Route, ROUTE_REFETCH_BODY)
    }

    fn snippet(&self) -> String {
        let mut snippet = String::from("\n{\nconst __hmrRefetch = () => {\n");
        snippet.push_str(&self.body);
        snippet.push_str("};\n");
        snippet.push_str(&self.slot.install_js("__hmrRefetch"));
        snippet.push_str("}\n");
        snippet
    }
}

impl PatchStrategy for MarkerPatch {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, module_id: &str) -> bool {
        // Query strings (`?v=123`) are not part of the module identity
        let path = module_id.split('?').next().unwrap_or(module_id);
        // Whole path segments only: `client.js` must not match `api-client.js`
        path.strip_suffix(self.module_suffix.as_str())
            .is_some_and(|head| head.is_empty() || head.ends_with('/'))
    }

    fn apply(&self, code: &str) -> Option<String> {
        let found = self.marker.find(code)?;
        let snippet = self.snippet();
        let mut out = String::with_capacity(code.len() + snippet.len());
        out.push_str(&code[..found.end()]);
        out.push_str(&snippet);
        out.push_str(&code[found.end()..]);
        Some(out)
    }
}

/// Ordered set of patch strategies; the first matching strategy wins.
#[derive(Default)]
pub struct SourcePatchInjector {
    strategies: Vec<Box<dyn PatchStrategy>>,
}

impl SourcePatchInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragment and router patches as configured in `[patch]`.
    pub fn from_config(config: &PatchConfig) -> Result<Self, regex::Error> {
        let mut injector = Self::new();
        injector.register(Box::new(MarkerPatch::router(
            &config.router_module,
            Regex::new(&config.router_marker)?,
        )));
        injector.register(Box::new(MarkerPatch::fragment(
            &config.fragment_module,
            Regex::new(&config.fragment_marker)?,
        )));
        Ok(injector)
    }

    pub fn register(&mut self, strategy: Box<dyn PatchStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Patch `code` of `module_id`, borrowing the input when nothing applies.
    pub fn patch<'a>(&self, module_id: &str, code: &'a str) -> Cow<'a, str> {
        let Some(strategy) = self.strategies.iter().find(|s| s.matches(module_id)) else {
            return Cow::Borrowed(code);
        };

        match strategy.apply(code) {
            Some(patched) => {
                crate::debug!("patch"; "{} hook installed in {}", strategy.name(), module_id);
                Cow::Owned(patched)
            }
            None => {
                crate::debug!("patch"; "{} marker not found in {}, left unchanged", strategy.name(), module_id);
                Cow::Borrowed(code)
            }
        }
    }
}
