//! Coordinator configuration (`hmr.toml`).
//!
//! ```text
//! config/
//! ├── section   # [serve] [client] [watch] [patch]
//! ├── error     # ConfigError
//! ├── handle    # Global config handle
//! └── util      # Config discovery, path normalization
//! ```
//!
//! A missing config file is not an error: every section has defaults.

mod error;
mod handle;
mod section;
mod util;

pub use error::ConfigError;
pub use handle::{cfg, init_config, reload_config};
pub use section::{ClientConfig, PatchConfig, ServeConfig, WatchConfig};
pub use util::normalize_path;

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::cli::{Cli, Commands};
use crate::debug;
use util::find_config_file;

/// CLI values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub interface: Option<IpAddr>,
    pub ws_port: Option<u16>,
}

/// Root configuration structure representing hmr.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HmrConfig {
    /// Absolute path to the config file (may not exist)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root: the config file's directory
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(skip)]
    pub overrides: Overrides,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub patch: PatchConfig,
}

impl HmrConfig {
    /// Load configuration for the parsed command line.
    ///
    /// Searches upward from cwd for the config file; falls back to defaults
    /// rooted at cwd when none exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = normalize_path(&path);
                config
            }
            None => {
                debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    config_path: cwd.join(&cli.config),
                    ..Self::default()
                }
            }
        };

        config.root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        if let Commands::Serve { interface, port } = &cli.command {
            config.overrides = Overrides {
                interface: *interface,
                ws_port: *port,
            };
        }

        config.finalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Apply CLI overrides.
    pub(crate) fn finalize(&mut self) {
        if let Some(interface) = self.overrides.interface {
            self.serve.interface = interface;
        }
        if let Some(port) = self.overrides.ws_port {
            self.serve.ws_port = port;
        }
    }

    /// Check values the rest of the system relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.client.script.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "[client] script must be an absolute URL path, got `{}`",
                self.client.script
            )));
        }

        let id_attr = &self.client.id_attr;
        if id_attr.is_empty() || id_attr.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "[client] id_attr must be a non-empty attribute name, got `{id_attr}`"
            )));
        }

        for (field, marker) in [
            ("fragment_marker", &self.patch.fragment_marker),
            ("router_marker", &self.patch.router_marker),
        ] {
            Regex::new(marker).map_err(|e| {
                ConfigError::Validation(format!("[patch] {field} is not a valid regex: {e}"))
            })?;
        }

        Ok(())
    }

    /// Absolute watched root.
    pub fn watch_root(&self) -> PathBuf {
        normalize_path(&self.root.join(&self.watch.root))
    }

    /// Absolute server component directories.
    pub fn server_dirs(&self) -> Vec<PathBuf> {
        let root = self.watch_root();
        self.watch.server.iter().map(|p| normalize_path(&root.join(p))).collect()
    }

    /// Absolute client source directories.
    pub fn client_dirs(&self) -> Vec<PathBuf> {
        let root = self.watch_root();
        self.watch.client.iter().map(|p| normalize_path(&root.join(p))).collect()
    }
}

/// Parse config text, panicking on errors (tests only).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> HmrConfig {
    HmrConfig::from_str(content).unwrap()
}
