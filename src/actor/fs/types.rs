use std::path::PathBuf;

use rustc_hash::FxHashMap;

use crate::hmr::ArtifactKind;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Debounced changes, one entry per path
pub(super) type RawChanges = FxHashMap<PathBuf, ChangeKind>;

/// What a single change means for connected browsers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Change {
    /// `hmr.toml` itself
    Config,
    /// A style file was deleted
    StyleRemoved,
    /// A style file was written
    Style(ArtifactKind),
    /// Anything under a server component directory
    Server,
    /// A script under a client directory
    ClientScript,
}
