//! `patch` and `plan`: one-shot views of what the coordinator would do.

use std::borrow::Cow;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::HmrConfig;
use crate::hmr::{Hmr, SourcePatchInjector};

/// Print `file` after reload hooks are injected.
pub fn patch(config: &HmrConfig, file: &Path, module_id: Option<&str>) -> Result<()> {
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let injector =
        SourcePatchInjector::from_config(&config.patch).context("invalid [patch] marker")?;

    let default_id = file.to_string_lossy().replace('\\', "/");
    let module_id = module_id.unwrap_or(&default_id);
    let out = injector.patch(module_id, &code);
    if matches!(out, Cow::Borrowed(_)) {
        crate::debug!("patch"; "{} left unchanged", module_id);
    }

    write_stdout(&out)
}

/// Print `html` with the client runtime and the (connection-less) plan spliced in.
pub fn plan(config: &HmrConfig, html: &Path) -> Result<()> {
    let page = std::fs::read_to_string(html)
        .with_context(|| format!("failed to read {}", html.display()))?;

    let hmr = Hmr::new(&config.client);
    hmr.set_ws_port(config.serve.ws_port);
    write_stdout(&hmr.render_page(&page, None))
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
