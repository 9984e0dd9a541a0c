use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::types::{ChangeKind, RawChanges};
use crate::config::normalize_path;

pub(super) const DEBOUNCE_MS: u64 = 300;
pub(super) const REBUILD_COOLDOWN_MS: u64 = 800;

/// Collects notify events until the tree has been quiet for `DEBOUNCE_MS`,
/// and keeps batches at least `REBUILD_COOLDOWN_MS` apart.
pub(super) struct Debouncer {
    pub(super) changes: RawChanges,
    pub(super) last_event: Option<Instant>,
    pub(super) last_flush: Option<Instant>,
}

/// Combine a pending change with a new one for the same path.
///
/// `None` drops the path from the batch.
fn merge(pending: ChangeKind, incoming: ChangeKind) -> Option<ChangeKind> {
    use ChangeKind::*;
    match (pending, incoming) {
        // Deleted then restored (editor atomic save)
        (Removed, Created | Modified) => Some(incoming),
        (Modified, Removed) => Some(Removed),
        // Appeared and vanished inside one window
        (Created, Removed) => None,
        _ => Some(pending),
    }
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: RawChanges::default(),
            last_event: None,
            last_flush: None,
        }
    }

    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;
        use notify::event::ModifyKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            // mtime/chmod noise
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        for path in event.paths.iter().filter(|p| !is_temp_file(p)) {
            self.add(normalize_path(path), kind);
        }
    }

    pub(super) fn add(&mut self, path: PathBuf, kind: ChangeKind) {
        let next = match self.changes.get(&path) {
            Some(&pending) => merge(pending, kind),
            None => Some(kind),
        };
        crate::debug!("watch"; "{} {}", kind.label(), path.display());
        match next {
            Some(kind) => self.changes.insert(path, kind),
            None => self.changes.remove(&path),
        };
        self.last_event = Some(Instant::now());
    }

    /// Take the batch once debounce and cooldown have elapsed.
    pub(super) fn take_if_ready(&mut self) -> Option<RawChanges> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        self.last_flush = Some(Instant::now());
        Some(std::mem::take(&mut self.changes))
    }

    pub(super) fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        if last_event.elapsed() < Duration::from_millis(DEBOUNCE_MS) {
            return false;
        }
        if let Some(last_flush) = self.last_flush
            && last_flush.elapsed() < Duration::from_millis(REBUILD_COOLDOWN_MS)
        {
            return false;
        }
        !self.changes.is_empty()
    }

    /// Time until the batch could become ready.
    pub(super) fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(3600);
        };
        let debounce = Duration::from_millis(DEBOUNCE_MS).saturating_sub(last_event.elapsed());
        let cooldown = self
            .last_flush
            .map(|t| Duration::from_millis(REBUILD_COOLDOWN_MS).saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);
        debounce.max(cooldown).max(Duration::from_millis(1))
    }
}

/// Editor swap/backup files and dotfiles.
pub(super) fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
