//! FileSystem Actor
//!
//! Watches the project and sends routed changes to the TransformActor.
//!
//! ```text
//! Watcher → Debouncer (timing) → correct_by_existence → ChangeRules → TransformMsg
//! ```

use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::messages::TransformMsg;
use crate::config::{HmrConfig, cfg};
use crate::logger::{status_error, status_unchanged};

mod classifier;
mod debouncer;
mod types;

#[cfg(test)]
mod tests;

use classifier::{ChangeRules, correct_by_existence};
use debouncer::Debouncer;

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
    transform_tx: mpsc::Sender<TransformMsg>,
    debouncer: Debouncer,
    rules: ChangeRules,
}

impl FsActor {
    /// Start watching immediately; events buffer until `run`.
    pub fn new(config: &HmrConfig, transform_tx: mpsc::Sender<TransformMsg>) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        for (path, mode) in watch_paths(config) {
            watcher.watch(&path, mode)?;
            crate::debug!("watch"; "watching {}", path.display());
        }

        Ok(Self {
            notify_rx,
            _watcher: watcher,
            transform_tx,
            debouncer: Debouncer::new(),
            rules: ChangeRules::from_config(config),
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let Self {
            notify_rx,
            _watcher,
            transform_tx,
            mut debouncer,
            mut rules,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => break,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration()) => {
                    if flush(&mut debouncer, &mut rules, &transform_tx).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Route a ready batch. `Err` means the TransformActor is gone.
async fn flush(
    debouncer: &mut Debouncer,
    rules: &mut ChangeRules,
    transform_tx: &mpsc::Sender<TransformMsg>,
) -> Result<(), ()> {
    let Some(mut raw) = debouncer.take_if_ready() else {
        return Ok(());
    };

    correct_by_existence(&mut raw);
    for msg in rules.route(raw) {
        if msg == TransformMsg::ConfigChanged && !reload_config(rules) {
            continue;
        }
        transform_tx.send(msg).await.map_err(|_| ())?;
    }
    Ok(())
}

/// Reload `hmr.toml` and re-derive the routing rules from it.
///
/// Returns `true` when a new config is in place.
fn reload_config(rules: &mut ChangeRules) -> bool {
    match crate::config::reload_config() {
        Ok(true) => {
            crate::log!("watch"; "config reloaded; [serve] and [client] changes apply after restart");
            rules.reconfigure(&cfg());
            true
        }
        Ok(false) => {
            status_unchanged("config unchanged");
            false
        }
        Err(e) => {
            status_error("config reload failed", &format!("{e:#}"));
            false
        }
    }
}

/// The watched root, plus the config file's directory when it lies outside it.
fn watch_paths(config: &HmrConfig) -> Vec<(PathBuf, RecursiveMode)> {
    let root = config.watch_root();
    let mut paths = Vec::new();
    if let Some(dir) = config.config_path.parent()
        && dir.is_dir()
        && !dir.starts_with(&root)
    {
        paths.push((dir.to_path_buf(), RecursiveMode::NonRecursive));
    }
    if root.is_dir() {
        paths.push((root, RecursiveMode::Recursive));
    } else {
        crate::log!("watch"; "{} does not exist, nothing to watch", root.display());
    }
    paths
}
