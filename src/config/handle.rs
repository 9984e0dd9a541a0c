//! Process-wide config handle.
//!
//! Reads are lock-free through `arc-swap`; a changed `hmr.toml` replaces the
//! whole config atomically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use arc_swap::ArcSwap;

use super::HmrConfig;

static CONFIG: LazyLock<ArcSwap<HmrConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(HmrConfig::default()));

/// Digest prefix of the config file content last loaded.
static CONFIG_HASH: AtomicU64 = AtomicU64::new(0);

#[inline]
pub fn cfg() -> Arc<HmrConfig> {
    CONFIG.load_full()
}

fn content_hash(content: &str) -> u64 {
    let digest = blake3::hash(content.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

pub fn init_config(config: HmrConfig) -> Arc<HmrConfig> {
    if let Ok(content) = std::fs::read_to_string(&config.config_path) {
        CONFIG_HASH.store(content_hash(&content), Ordering::Relaxed);
    }

    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}

/// Reload config from disk if its content changed.
///
/// CLI overrides applied at startup are carried over to the new config.
/// Returns `Ok(true)` if the config was replaced.
pub fn reload_config() -> Result<bool> {
    let current = cfg();
    let content = std::fs::read_to_string(&current.config_path)
        .map_err(|e| super::ConfigError::Io(current.config_path.clone(), e))?;

    let hash = content_hash(&content);
    if hash == CONFIG_HASH.load(Ordering::Relaxed) {
        return Ok(false);
    }

    let mut next = HmrConfig::from_str(&content)?;
    next.config_path = current.config_path.clone();
    next.root = current.root.clone();
    next.overrides = current.overrides.clone();
    next.finalize();
    next.validate()?;

    CONFIG.store(Arc::new(next));
    CONFIG_HASH.store(hash, Ordering::Relaxed);
    Ok(true)
}
