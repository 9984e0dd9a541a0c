//! rsc-hmr - hot-update coordinator for server-driven component dev servers.

mod actor;
mod cli;
mod config;
mod core;
mod embed;
mod hmr;
mod logger;
mod transform;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{HmrConfig, init_config};

fn main() -> Result<()> {
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = init_config(HmrConfig::load(&cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(config),
        Commands::Patch { file, module_id } => {
            cli::inspect::patch(&config, file, module_id.as_deref())
        }
        Commands::Plan { html } => cli::inspect::plan(&config, html),
    }
}
