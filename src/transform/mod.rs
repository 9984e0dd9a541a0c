//! Inbound transform layer: source file → [`Artifact`].
//!
//! Turns one changed module into the unit the coordinator delivers. Results
//! are cached per path and content, so transforming an unchanged file hands
//! back the same `Arc` and the gate can recognise it as already delivered.

mod css;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::debug;
use crate::hmr::{Artifact, ArtifactKind, SourcePatchInjector};

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("CSS error in `{path}`: {message}")]
    Css { path: PathBuf, message: String },

    #[error("`{0}` is not a script or stylesheet")]
    UnsupportedKind(PathBuf),
}

pub struct Transformer {
    root: PathBuf,
    id_attr: String,
    patcher: ArcSwap<SourcePatchInjector>,
    cache: Mutex<FxHashMap<PathBuf, (blake3::Hash, Arc<Artifact>)>>,
}

impl Transformer {
    pub fn new(root: impl Into<PathBuf>, id_attr: impl Into<String>, patcher: SourcePatchInjector) -> Self {
        Self {
            root: root.into(),
            id_attr: id_attr.into(),
            patcher: ArcSwap::from_pointee(patcher),
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    /// Stable identity of a source file: its project-relative URL path.
    ///
    /// Files outside the project root use the `/@fs` prefix with their
    /// absolute path.
    pub fn identity(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => format!("/{}", to_url_path(rel)),
            Err(_) => format!("/@fs/{}", to_url_path(path).trim_start_matches('/')),
        }
    }

    /// Transform `path`, classifying it by file name.
    pub fn transform_path(&self, path: &Path) -> Result<Arc<Artifact>, TransformError> {
        let kind = ArtifactKind::from_path(path)
            .ok_or_else(|| TransformError::UnsupportedKind(path.to_path_buf()))?;
        self.transform(path, kind)
    }

    pub fn transform(&self, path: &Path, kind: ArtifactKind) -> Result<Arc<Artifact>, TransformError> {
        let source =
            std::fs::read_to_string(path).map_err(|e| TransformError::Io(path.to_path_buf(), e))?;
        let digest = blake3::hash(source.as_bytes());

        if let Some((cached, artifact)) = self.cache.lock().get(path)
            && *cached == digest
            && artifact.kind() == kind
        {
            debug!("transform"; "{} unchanged", artifact.id());
            return Ok(Arc::clone(artifact));
        }

        let id = self.identity(path);
        let artifact = Arc::new(match kind {
            ArtifactKind::Script => {
                let code = self.patcher.load().patch(&id, &source).into_owned();
                Artifact::new(id, kind, code, source)
            }
            ArtifactKind::Stylesheet => {
                let code = style_module(&self.id_attr, &id, &source, None);
                Artifact::stylesheet(id, code, source)
            }
            ArtifactKind::CssModuleScript => {
                let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or(id.as_str());
                let compiled = css::compile_module(filename, &source).map_err(|message| {
                    TransformError::Css {
                        path: path.to_path_buf(),
                        message,
                    }
                })?;
                let code = style_module(&self.id_attr, &id, &compiled.css, Some(&compiled.exports));
                Artifact::css_module(id, code, source)
            }
        }
        .with_source(path));

        debug!("transform"; "{} -> {} ({})", artifact.id(), artifact.kind().label(), artifact.fingerprint());
        self.cache
            .lock()
            .insert(path.to_path_buf(), (digest, Arc::clone(&artifact)));
        Ok(artifact)
    }

    /// Swap the patch rules (after a config reload). Cached scripts were
    /// patched with the old rules, so the cache is dropped.
    pub fn set_patcher(&self, patcher: SourcePatchInjector) {
        self.patcher.store(Arc::new(patcher));
        self.clear();
    }

    /// Forget every cached result.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Drop the cached result for one file.
    pub fn invalidate(&self, path: &Path) {
        self.cache.lock().remove(path);
    }

    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

/// Characters escaped in identity URLs; `/` stays as the separator.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn to_url_path(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    utf8_percent_encode(&path, PATH_SEGMENT).to_string()
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

/// Module script that installs `css` in a `<style>` tagged with `id`,
/// replacing the previous version in place.
fn style_module(
    id_attr: &str,
    id: &str,
    css: &str,
    exports: Option<&serde_json::Map<String, serde_json::Value>>,
) -> String {
    let mut code = format!(
        "const __hmrId = {id};\n\
         const __hmrAttr = {attr};\n\
         let __hmrStyle = document.querySelector(\"style[\" + __hmrAttr + \"=\\\"\" + CSS.escape(__hmrId) + \"\\\"]\");\n\
         if (!__hmrStyle) {{\n\
         __hmrStyle = document.createElement(\"style\");\n\
         __hmrStyle.setAttribute(__hmrAttr, __hmrId);\n\
         document.head.appendChild(__hmrStyle);\n\
         }}\n\
         __hmrStyle.textContent = {css};\n",
        id = js_string(id),
        attr = js_string(id_attr),
        css = js_string(css),
    );
    if let Some(exports) = exports {
        let map = serde_json::to_string(exports).unwrap_or_else(|_| "{}".into());
        code.push_str(&format!("export default {map};\n"));
    }
    code
}
