use std::path::{Path, PathBuf};

use super::types::{Change, ChangeKind, RawChanges};
use crate::actor::messages::TransformMsg;
use crate::config::HmrConfig;
use crate::hmr::ArtifactKind;

/// Decides what each changed path means and turns a batch into messages.
#[derive(Debug, Clone)]
pub(super) struct ChangeRules {
    config_path: PathBuf,
    root: PathBuf,
    server_dirs: Vec<PathBuf>,
    client_dirs: Vec<PathBuf>,
    ignore: Vec<String>,
}

impl ChangeRules {
    pub(super) fn from_config(config: &HmrConfig) -> Self {
        Self {
            config_path: config.config_path.clone(),
            root: config.watch_root(),
            server_dirs: config.server_dirs(),
            client_dirs: config.client_dirs(),
            ignore: config.watch.ignore.clone(),
        }
    }

    /// Adopt the `[watch]` dirs of a reloaded config.
    ///
    /// The watcher stays on the root it started with, so a changed
    /// `[watch] root` is reported and otherwise ignored until restart.
    pub(super) fn reconfigure(&mut self, config: &HmrConfig) {
        let next = Self::from_config(config);
        if next.root != self.root {
            crate::log!("watch"; "[watch] root changed; restart to watch {}", next.root.display());
            return;
        }
        *self = next;
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return true;
        };
        rel.components()
            .filter_map(|c| c.as_os_str().to_str())
            .any(|name| self.ignore.iter().any(|ignored| ignored == name))
    }

    pub(super) fn classify(&self, path: &Path, kind: ChangeKind) -> Option<Change> {
        if path == self.config_path {
            return Some(Change::Config);
        }
        if self.is_ignored(path) {
            return None;
        }

        let artifact = ArtifactKind::from_path(path);
        match artifact {
            Some(style) if style.is_style() => Some(match kind {
                ChangeKind::Removed => Change::StyleRemoved,
                _ => Change::Style(style),
            }),
            _ if self.server_dirs.iter().any(|d| path.starts_with(d)) => Some(Change::Server),
            Some(ArtifactKind::Script)
                if kind != ChangeKind::Removed
                    && self.client_dirs.iter().any(|d| path.starts_with(d)) =>
            {
                Some(Change::ClientScript)
            }
            _ => None,
        }
    }

    /// Turn one debounced batch into transform messages.
    ///
    /// A config change or a removed style reloads the page and nothing else
    /// is sent. Otherwise a fragment refetch goes first so that the style
    /// imports after it are delivered to a cleared registry.
    pub(super) fn route(&self, raw: RawChanges) -> Vec<TransformMsg> {
        let mut changes: Vec<_> = raw.into_iter().collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));

        let mut server = Vec::new();
        let mut imports = Vec::new();
        let mut hot = Vec::new();
        let mut removed = Vec::new();

        for (path, kind) in changes {
            match self.classify(&path, kind) {
                Some(Change::Config) => return vec![TransformMsg::ConfigChanged],
                Some(Change::StyleRemoved) => removed.push(path),
                Some(Change::Style(kind)) => imports.push(TransformMsg::Import { path, kind }),
                Some(Change::Server) => server.push(path),
                Some(Change::ClientScript) => hot.push(TransformMsg::HotImport(path)),
                None => crate::debug!("watch"; "ignored {}", path.display()),
            }
        }

        if !removed.is_empty() {
            return vec![TransformMsg::FullReload {
                reason: format!("removed {}", self.display(&removed[0])),
                invalidate: removed,
            }];
        }

        let mut messages = Vec::with_capacity(imports.len() + hot.len() + 1);
        if let Some(first) = server.first() {
            let reason = match server.len() {
                1 => self.display(first),
                n => format!("{} and {} more", self.display(first), n - 1),
            };
            messages.push(TransformMsg::RscReload { reason });
        }
        messages.extend(imports);
        messages.extend(hot);
        messages
    }

    fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Reconcile event kinds with what is on disk now.
///
/// Atomic saves report `Removed` for a file that exists again, and fast
/// create/delete sequences leave `Created` for files that are gone.
pub(super) fn correct_by_existence(changes: &mut RawChanges) {
    changes.retain(|path, kind| {
        let exists = path.is_file();
        match *kind {
            ChangeKind::Created if !exists => false,
            ChangeKind::Modified if !exists => {
                if path.exists() {
                    // Directory modification
                    return false;
                }
                *kind = ChangeKind::Removed;
                true
            }
            ChangeKind::Removed if exists => {
                *kind = ChangeKind::Modified;
                true
            }
            _ => true,
        }
    });
}
