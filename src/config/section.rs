//! `hmr.toml` sections.
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"
//! ws_port = 24678
//!
//! [client]
//! script = "/@hmr/client"
//! id_attr = "data-hmr-module-id"
//!
//! [watch]
//! root = "."
//! server = ["src/server"]
//! client = ["src/client"]
//! ignore = ["node_modules", "dist", ".git"]
//!
//! [patch]
//! fragment_module = "client.js"
//! router_module = "router/client.js"
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use serde::Deserialize;

/// `[serve]`: WebSocket transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// Interface to bind. `0.0.0.0` makes the socket reachable from LAN.
    pub interface: IpAddr,
    /// First port tried; successive ports are tried when it is taken.
    pub ws_port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ws_port: 24678,
        }
    }
}

/// `[client]`: how injected elements look in the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// URL of the external dev-transport client script that CSS-module
    /// scripts import from.
    pub script: String,
    /// Attribute carrying an artifact's identity on injected elements.
    pub id_attr: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            script: "/@hmr/client".into(),
            id_attr: "data-hmr-module-id".into(),
        }
    }
}

/// `[watch]`: which changes trigger which update.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Watched root, relative to the config file's directory.
    pub root: PathBuf,
    /// Server component sources; a change refetches fragments.
    pub server: Vec<PathBuf>,
    /// Client sources; a script change is hot-imported.
    pub client: Vec<PathBuf>,
    /// Directory names skipped anywhere in the tree.
    pub ignore: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            server: vec![PathBuf::from("src/server")],
            client: vec![PathBuf::from("src/client")],
            ignore: vec!["node_modules".into(), "dist".into(), ".git".into()],
        }
    }
}

/// `[patch]`: where reload hooks go in the generated framework modules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchConfig {
    /// Module id suffix of the fragment-fetch module.
    pub fragment_module: String,
    /// Regex matching the start of the fragment fetch function body.
    pub fragment_marker: String,
    /// Module id suffix of the router module.
    pub router_module: String,
    /// Regex matching the start of the router component body.
    pub router_marker: String,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            fragment_module: "client.js".into(),
            fragment_marker: r"\nexport const fetchRsc = \(.*?\)=>\{".into(),
            router_module: "router/client.js".into(),
            router_marker: r"\nconst InnerRouter = \(.*?\)=>\{".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    use std::path::PathBuf;

    #[test]
    fn test_serve_config() {
        let config = test_parse_config("[serve]\ninterface = \"0.0.0.0\"\nws_port = 8080");
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.serve.ws_port, 8080);

        let config = test_parse_config("[serve]\ninterface = \"::1\"");
        assert_eq!(config.serve.interface, IpAddr::V6(Ipv6Addr::LOCALHOST));
    }

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.serve.interface, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.serve.ws_port, 24678);
        assert_eq!(config.client.script, "/@hmr/client");
        assert_eq!(config.client.id_attr, "data-hmr-module-id");
        assert_eq!(config.watch.server, vec![PathBuf::from("src/server")]);
        assert_eq!(config.patch.router_module, "router/client.js");
    }

    #[test]
    fn test_watch_config() {
        let config = test_parse_config(
            "[watch]\nroot = \"app\"\nserver = [\"rsc\", \"lib\"]\nignore = [\"target\"]",
        );
        assert_eq!(config.watch.root, PathBuf::from("app"));
        assert_eq!(config.watch.server.len(), 2);
        assert_eq!(config.watch.ignore, vec!["target".to_string()]);
        // Unset fields keep their defaults
        assert_eq!(config.watch.client, vec![PathBuf::from("src/client")]);
    }

    #[test]
    fn test_patch_marker_literal_strings() {
        let config = test_parse_config("[patch]\nfragment_marker = 'fetchRsc = \\('");
        assert_eq!(config.patch.fragment_marker, r"fetchRsc = \(");
    }
}
