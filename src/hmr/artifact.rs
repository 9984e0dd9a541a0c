//! Update artifacts.
//!
//! An [`Artifact`] is one client-deliverable unit produced by the transform
//! layer: a script, a plain stylesheet, or a CSS-module script. Two artifacts
//! are the *same* delivery when both their identity and their content digest
//! match; a new version of a module keeps its identity but changes digest.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

/// What an artifact is, which decides how it is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// Executable client module.
    Script,
    /// Plain stylesheet, injected as literal text.
    Stylesheet,
    /// Stylesheet compiled to a module whose evaluation installs the styles.
    CssModuleScript,
}

impl ArtifactKind {
    /// Classify a source file by name.
    ///
    /// `*.module.css` is checked before `*.css` so CSS modules never fall
    /// into the plain stylesheet branch.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let ext = path.extension()?.to_str()?;
        match ext {
            "css" if name.ends_with(".module.css") => Some(Self::CssModuleScript),
            "css" => Some(Self::Stylesheet),
            "js" | "mjs" | "jsx" | "ts" | "tsx" => Some(Self::Script),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Stylesheet => "stylesheet",
            Self::CssModuleScript => "css-module-script",
        }
    }

    /// Whether this kind carries styles (and therefore takes part in initial injection).
    pub fn is_style(self) -> bool {
        matches!(self, Self::Stylesheet | Self::CssModuleScript)
    }
}

/// A prepared update for the browser.
///
/// Immutable once built, apart from the stale flag which the session registry
/// raises when a full invalidation voids the delivery that carried it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    id: String,
    kind: ArtifactKind,
    code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    raw_source: String,
    #[serde(skip)]
    digest: blake3::Hash,
    #[serde(skip)]
    source: Option<PathBuf>,
    #[serde(skip)]
    stale: AtomicBool,
}

impl Artifact {
    pub fn new(
        id: impl Into<String>,
        kind: ArtifactKind,
        code: impl Into<String>,
        raw_source: impl Into<String>,
    ) -> Self {
        let code = code.into();
        let raw_source = raw_source.into();

        let mut hasher = blake3::Hasher::new();
        hasher.update(kind.label().as_bytes());
        hasher.update(&[0]);
        hasher.update(code.as_bytes());
        hasher.update(&[0]);
        hasher.update(raw_source.as_bytes());

        Self {
            id: id.into(),
            kind,
            code,
            raw_source,
            digest: hasher.finalize(),
            source: None,
            stale: AtomicBool::new(false),
        }
    }

    pub fn script(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(id, ArtifactKind::Script, code, String::new())
    }

    pub fn stylesheet(
        id: impl Into<String>,
        code: impl Into<String>,
        raw_source: impl Into<String>,
    ) -> Self {
        Self::new(id, ArtifactKind::Stylesheet, code, raw_source)
    }

    pub fn css_module(
        id: impl Into<String>,
        code: impl Into<String>,
        raw_source: impl Into<String>,
    ) -> Self {
        Self::new(id, ArtifactKind::CssModuleScript, code, raw_source)
    }

    /// Remember the file this artifact was built from.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Source file, when built from one. Used to rebuild after invalidation.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Stable key of the logical module (also the DOM identity attribute value).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Transformed content for client-side execution.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Untransformed source (embedded verbatim for plain stylesheets).
    pub fn raw_source(&self) -> &str {
        &self.raw_source
    }

    /// Short hex digest of the content, for logs.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.digest.as_bytes()[..4])
    }

    /// Same logical module with identical content.
    pub fn same_as(&self, other: &Artifact) -> bool {
        self.id == other.id && self.digest == other.digest
    }

    /// Set after a full invalidation voided the delivery that carried this artifact.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    pub(crate) fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    pub(crate) fn mark_fresh(&self) {
        self.stale.store(false, Ordering::Release);
    }
}
