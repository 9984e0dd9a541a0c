//! Embedded browser runtime.
//!
//! `client.js` is minified by `build.rs` and compiled into the binary. Values
//! only known at runtime (the bound WebSocket port, the identity attribute)
//! are substituted into placeholders when the runtime element is rendered.

use std::marker::PhantomData;

use crate::hmr::{InjectTo, InjectableElement};

/// Substitution applied to an embedded template.
pub trait TemplateVars {
    fn apply(&self, content: &str) -> String;
}

/// Embedded text bound to the variable set that renders it.
#[derive(Debug, Clone, Copy)]
pub struct Template<V> {
    content: &'static str,
    _vars: PhantomData<V>,
}

impl<V> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _vars: PhantomData,
        }
    }

    pub const fn raw(&self) -> &'static str {
        self.content
    }
}

impl<V: TemplateVars> Template<V> {
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}

/// Placeholders of the client runtime.
pub struct ClientVars<'a> {
    pub ws_port: u16,
    pub id_attr: &'a str,
}

impl TemplateVars for ClientVars<'_> {
    fn apply(&self, content: &str) -> String {
        content
            .replace("__HMR_WS_PORT__", &self.ws_port.to_string())
            .replace("__HMR_ID_ATTR__", self.id_attr)
    }
}

/// Minified client runtime.
pub const CLIENT_JS: Template<ClientVars<'static>> =
    Template::new(include_str!(concat!(env!("OUT_DIR"), "/client.min.js")));

/// `<script type="module">` carrying the client runtime, placed in `<head>`
/// after anything prepended by the injection plan.
pub fn runtime_element(ws_port: u16, id_attr: &str) -> InjectableElement {
    let js = CLIENT_JS.render(&ClientVars { ws_port, id_attr });
    InjectableElement::new("script", InjectTo::Head)
        .attr("type", "module")
        .children(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_placeholders_replaced() {
        let js = CLIENT_JS.render(&ClientVars {
            ws_port: 24678,
            id_attr: "data-x",
        });
        assert!(!js.contains("__HMR_WS_PORT__"));
        assert!(!js.contains("__HMR_ID_ATTR__"));
        assert!(js.contains("24678"));
        assert!(js.contains("data-x"));
    }

    #[test]
    fn test_raw_keeps_placeholders() {
        assert!(CLIENT_JS.raw().contains("__HMR_WS_PORT__"));
    }

    #[test]
    fn test_runtime_element_shape() {
        let el = runtime_element(3000, "data-hmr-module-id");
        assert_eq!(el.tag, "script");
        assert_eq!(el.inject_to, InjectTo::Head);
        assert_eq!(el.get_attr("type"), Some("module"));
        assert!(el.children.contains("3000"));
    }
}
