//! Stylesheet compilation with `lightningcss`.

use lightningcss::css_modules::{Config, CssModuleReference};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use serde_json::{Map, Value};

/// Output of compiling a CSS module.
#[derive(Debug)]
pub struct CompiledModule {
    /// CSS with local names rewritten.
    pub css: String,
    /// Local class name → space-separated generated names (including composes).
    pub exports: Map<String, Value>,
}

/// Compile `source` as a CSS module. `filename` seeds the generated name hash.
pub fn compile_module(filename: &str, source: &str) -> Result<CompiledModule, String> {
    let stylesheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: filename.to_string(),
            css_modules: Some(Config::default()),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    let result = stylesheet
        .to_css(PrinterOptions::default())
        .map_err(|e| e.to_string())?;

    let mut names: Vec<_> = result.exports.unwrap_or_default().into_iter().collect();
    names.sort_by(|a, b| a.0.cmp(&b.0));

    let mut exports = Map::new();
    for (local, export) in names {
        let mut classes = vec![export.name];
        for composed in export.composes {
            match composed {
                CssModuleReference::Local { name } | CssModuleReference::Global { name } => {
                    classes.push(name);
                }
                // Cross-file composes need the other file's exports
                CssModuleReference::Dependency { .. } => {}
            }
        }
        exports.insert(local, Value::String(classes.join(" ")));
    }

    Ok(CompiledModule {
        css: result.code,
        exports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_names_are_rewritten() {
        let out = compile_module("button.module.css", ".primary { color: red }").unwrap();
        let generated = out.exports["primary"].as_str().unwrap();
        assert_ne!(generated, "primary");
        assert!(generated.ends_with("_primary"));
        assert!(out.css.contains(generated));
    }

    #[test]
    fn test_composes_are_joined() {
        let out = compile_module(
            "a.module.css",
            ".base { color: red }\n.title { composes: base; font-weight: bold }",
        )
        .unwrap();
        let title = out.exports["title"].as_str().unwrap();
        assert_eq!(title.split(' ').count(), 2);
    }
}
