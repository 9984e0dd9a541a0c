//! Update Event Protocol
//!
//! JSON messages pushed over the WebSocket to the browser runtime.
//!
//! # Wire shapes
//!
//! - `{"type":"full-reload"}`
//! - `{"type":"custom","event":"rsc-reload"}`
//! - `{"type":"custom","event":"module-import","data":<artifact>}`
//! - `{"type":"custom","event":"hot-import","data":"<path>"}`

use std::sync::Arc;

use serde::Serialize;

use super::artifact::Artifact;

/// Update event delivered to one connection.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    /// Reload the whole page.
    FullReload,
    /// Drop cached fragment DOM and run the reload listeners.
    RscReload,
    /// Install (or replace) one module in the page.
    ModuleImport(Arc<Artifact>),
    /// Dynamically import a module by path.
    HotImport(String),
}

/// Events that may be broadcast to every live connection.
///
/// Has no `module-import`: that only travels through the
/// connection gate, which deduplicates per connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Broadcast {
    FullReload,
    RscReload,
    HotImport(String),
}

impl From<Broadcast> for UpdateEvent {
    fn from(event: Broadcast) -> Self {
        match event {
            Broadcast::FullReload => Self::FullReload,
            Broadcast::RscReload => Self::RscReload,
            Broadcast::HotImport(path) => Self::HotImport(path),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum Wire<'a> {
    FullReload,
    Custom(Custom<'a>),
}

#[derive(Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
enum Custom<'a> {
    RscReload,
    ModuleImport(&'a Artifact),
    HotImport(&'a str),
}

impl UpdateEvent {
    /// Short name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FullReload => "full-reload",
            Self::RscReload => "rsc-reload",
            Self::ModuleImport(_) => "module-import",
            Self::HotImport(_) => "hot-import",
        }
    }

    fn wire(&self) -> Wire<'_> {
        match self {
            Self::FullReload => Wire::FullReload,
            Self::RscReload => Wire::Custom(Custom::RscReload),
            Self::ModuleImport(artifact) => Wire::Custom(Custom::ModuleImport(artifact)),
            Self::HotImport(path) => Wire::Custom(Custom::HotImport(path)),
        }
    }

    /// Serialize to JSON string.
    ///
    /// Falls back to a full reload if serialization ever fails: the browser
    /// then recovers by itself instead of silently missing the update.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.wire())
            .unwrap_or_else(|_| r#"{"type":"full-reload"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn parse(event: &UpdateEvent) -> Value {
        serde_json::from_str(&event.to_json()).unwrap()
    }

    #[test]
    fn test_full_reload_shape() {
        assert_eq!(parse(&UpdateEvent::FullReload), json!({"type": "full-reload"}));
    }

    #[test]
    fn test_rsc_reload_shape() {
        assert_eq!(
            parse(&UpdateEvent::RscReload),
            json!({"type": "custom", "event": "rsc-reload"})
        );
    }

    #[test]
    fn test_module_import_shape() {
        let artifact = Arc::new(Artifact::stylesheet("/src/a.css", "js", "a{}"));
        let value = parse(&UpdateEvent::ModuleImport(artifact));

        assert_eq!(value["type"], "custom");
        assert_eq!(value["event"], "module-import");
        assert_eq!(value["data"]["id"], "/src/a.css");
        assert_eq!(value["data"]["kind"], "stylesheet");
        assert_eq!(value["data"]["code"], "js");
        assert_eq!(value["data"]["rawSource"], "a{}");
    }

    #[test]
    fn test_hot_import_shape() {
        let value = parse(&UpdateEvent::HotImport("/src/client/app.tsx".into()));
        assert_eq!(
            value,
            json!({"type": "custom", "event": "hot-import", "data": "/src/client/app.tsx"})
        );
    }

    #[test]
    fn test_broadcast_conversion() {
        let event: UpdateEvent = Broadcast::HotImport("/x.js".into()).into();
        assert_eq!(event.label(), "hot-import");
        assert!(matches!(
            UpdateEvent::from(Broadcast::RscReload),
            UpdateEvent::RscReload
        ));
    }
}
