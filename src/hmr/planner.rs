//! Injection Planner
//!
//! Turns a connection's delivered artifacts into the elements a freshly
//! rendered page must contain, and splices them into HTML.
//!
//! Ordering rules:
//!
//! - CSS-module artifacts are module code importing from the dev client
//!   script, so the first one is preceded by a render-blocking load of that
//!   script. Each is then emitted as an early-head module script.
//! - Plain stylesheets are literal text, emitted as `<style>` at the end of
//!   `<body>`.
//! - Otherwise registration order is kept; nothing is re-sorted.

use std::sync::Arc;

use serde::Serialize;

use super::artifact::{Artifact, ArtifactKind};
use super::connection::Connection;
use super::registry::SessionRegistry;

/// Where an element goes in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectTo {
    /// Start of `<head>`, before anything the page declares.
    HeadPrepend,
    /// End of `<head>`.
    Head,
    /// End of `<body>`.
    BodyAppend,
}

/// An element to inject at initial page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectableElement {
    pub tag: &'static str,
    pub attrs: Vec<(String, String)>,
    pub children: String,
    pub inject_to: InjectTo,
}

impl InjectableElement {
    pub fn new(tag: &'static str, inject_to: InjectTo) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: String::new(),
            inject_to,
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn children(mut self, children: impl Into<String>) -> Self {
        self.children = children.into();
        self
    }

    /// Value of an attribute, if present.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Render as HTML.
    ///
    /// Boolean attributes are written with an empty value. Raw-text content
    /// is guarded against early termination of the element.
    pub fn to_html(&self) -> String {
        let mut html = format!("<{}", self.tag);
        for (name, value) in &self.attrs {
            if value.is_empty() {
                html.push_str(&format!(" {name}"));
            } else {
                html.push_str(&format!(" {name}=\"{}\"", escape_attr(value)));
            }
        }
        html.push('>');
        html.push_str(&guard_raw_text(self.tag, &self.children));
        html.push_str(&format!("</{}>", self.tag));
        html
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

/// Keep `</script` / `</style` inside content from closing the element.
fn guard_raw_text(tag: &str, content: &str) -> String {
    let closing = format!("</{tag}");
    if !content.to_ascii_lowercase().contains(&closing) {
        return content.to_string();
    }
    let mut out = String::with_capacity(content.len() + 8);
    let lower = content.to_ascii_lowercase();
    let mut last = 0;
    for (pos, _) in lower.match_indices(&closing) {
        out.push_str(&content[last..pos]);
        out.push_str("<\\/");
        last = pos + 2;
    }
    out.push_str(&content[last..]);
    out
}

pub struct InjectionPlanner {
    registry: Arc<SessionRegistry>,
    client_script: String,
    id_attr: String,
}

impl InjectionPlanner {
    /// `client_script` is the URL of the dev transport client, `id_attr` the
    /// attribute carrying artifact identity on injected elements.
    pub fn new(
        registry: Arc<SessionRegistry>,
        client_script: impl Into<String>,
        id_attr: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            client_script: client_script.into(),
            id_attr: id_attr.into(),
        }
    }

    /// Elements to inject for `conn`. Empty if nothing was delivered to it.
    pub fn plan(&self, conn: &Connection) -> Vec<InjectableElement> {
        self.plan_artifacts(&self.registry.delivered(conn))
    }

    /// Plan an explicit artifact list (already in registration order).
    pub fn plan_artifacts(&self, artifacts: &[Arc<Artifact>]) -> Vec<InjectableElement> {
        let mut elements = Vec::with_capacity(artifacts.len() + 1);
        let mut client_loaded = false;

        for artifact in artifacts {
            match artifact.kind() {
                ArtifactKind::CssModuleScript => {
                    if !client_loaded {
                        elements.push(self.client_blocker());
                        client_loaded = true;
                    }
                    elements.push(
                        InjectableElement::new("script", InjectTo::HeadPrepend)
                            .attr("type", "module")
                            .attr(&self.id_attr, artifact.id())
                            .children(artifact.code()),
                    );
                }
                ArtifactKind::Stylesheet => {
                    elements.push(
                        InjectableElement::new("style", InjectTo::BodyAppend)
                            .attr(&self.id_attr, artifact.id())
                            .children(artifact.raw_source()),
                    );
                }
                // Scripts enter the page through the module graph, not markup
                ArtifactKind::Script => {
                    crate::debug!("hmr"; "plan: skip script {}", artifact.id());
                }
            }
        }

        elements
    }

    /// Render-blocking load of the dev client, so CSS-module code importing
    /// from it never runs first and styles land before first paint.
    fn client_blocker(&self) -> InjectableElement {
        InjectableElement::new("script", InjectTo::HeadPrepend)
            .attr("type", "module")
            .attr("blocking", "render")
            .attr("src", &self.client_script)
    }
}

// =============================================================================
// HTML splicing
// =============================================================================

/// Splice elements into an HTML document at their injection points.
///
/// Elements sharing an injection point keep their relative order. Missing
/// `<head>` falls back to the document start, missing `</body>` to the end.
pub fn inject_html(html: &str, elements: &[InjectableElement]) -> String {
    let render = |to: InjectTo| -> String {
        elements
            .iter()
            .filter(|e| e.inject_to == to)
            .map(InjectableElement::to_html)
            .collect()
    };
    let head_prepend = render(InjectTo::HeadPrepend);
    let head = render(InjectTo::Head);
    let body = render(InjectTo::BodyAppend);

    // ASCII lowercasing keeps byte offsets identical
    let lower = html.to_ascii_lowercase();

    let head_open_end = find_head_open(&lower);
    let head_close = lower.find("</head>");
    let body_close = lower.rfind("</body>");

    let mut inserts: Vec<(usize, &str)> = Vec::with_capacity(3);
    match (head_open_end, head_close) {
        (Some(open_end), Some(close)) => {
            inserts.push((open_end, head_prepend.as_str()));
            inserts.push((close, head.as_str()));
        }
        (Some(open_end), None) => {
            inserts.push((open_end, head_prepend.as_str()));
            inserts.push((open_end, head.as_str()));
        }
        (None, Some(close)) => {
            inserts.push((close, head_prepend.as_str()));
            inserts.push((close, head.as_str()));
        }
        (None, None) => {
            let start = doctype_end(&lower);
            inserts.push((start, head_prepend.as_str()));
            inserts.push((start, head.as_str()));
        }
    }
    inserts.push((body_close.unwrap_or(html.len()), body.as_str()));

    // Stable sort: equal positions keep head-prepend, head, body order
    inserts.sort_by_key(|(pos, _)| *pos);

    let extra: usize = inserts.iter().map(|(_, s)| s.len()).sum();
    let mut out = String::with_capacity(html.len() + extra);
    let mut last = 0;
    for (pos, text) in inserts {
        out.push_str(&html[last..pos]);
        out.push_str(text);
        last = pos;
    }
    out.push_str(&html[last..]);
    out
}

/// Byte offset just past the `<head ...>` opening tag.
fn find_head_open(lower: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = lower[from..].find("<head") {
        let start = from + rel;
        let after = start + "<head".len();
        match lower.as_bytes().get(after) {
            Some(b'>') => return Some(after + 1),
            Some(c) if c.is_ascii_whitespace() => {
                return lower[after..].find('>').map(|end| after + end + 1);
            }
            // `<header>` and friends
            _ => from = after,
        }
    }
    None
}

/// Byte offset just past a leading `<!doctype ...>`, or 0.
fn doctype_end(lower: &str) -> usize {
    let trimmed = lower.trim_start();
    if trimmed.starts_with("<!doctype") {
        let offset = lower.len() - trimmed.len();
        trimmed.find('>').map(|end| offset + end + 1).unwrap_or(0)
    } else {
        0
    }
}
