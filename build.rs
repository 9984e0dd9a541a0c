//! Build script minifying the embedded client runtime.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use std::fs;
use std::path::Path;

const CLIENT_JS: &str = "src/embed/serve/client.js";

/// Placeholders substituted at runtime; they must survive minification.
const PLACEHOLDERS: [&str; 2] = ["__HMR_WS_PORT__", "__HMR_ID_ATTR__"];

fn main() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let output = Path::new(&out_dir).join("client.min.js");

    let source = fs::read_to_string(CLIENT_JS).expect("Failed to read client.js");
    let code = minify_js(&source);
    for placeholder in PLACEHOLDERS {
        assert!(
            code.contains(placeholder),
            "{placeholder} was lost while minifying client.js"
        );
    }
    fs::write(output, code).expect("Failed to write client.min.js");

    println!("cargo:rerun-if-changed={CLIENT_JS}");
}

fn minify_js(source: &str) -> String {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();

    let ret = Parser::new(&allocator, source, source_type).parse();
    assert!(ret.errors.is_empty(), "Parse errors: {:?}", ret.errors);

    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code
}
