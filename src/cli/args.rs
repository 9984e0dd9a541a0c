//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Hot-update coordinator for server-driven component dev servers
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: hmr.toml)
    #[arg(short = 'C', long, global = true, default_value = "hmr.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch the project and push updates to connected browsers
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// First WebSocket port to try
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print a module after reload hooks have been injected
    #[command(visible_alias = "p")]
    Patch {
        /// Generated client module to patch
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// Module identity used to pick a patch (defaults to the file path)
        #[arg(short, long)]
        module_id: Option<String>,
    },

    /// Print an HTML page with the client runtime and injection plan spliced in
    Plan {
        /// Rendered HTML page
        #[arg(value_hint = clap::ValueHint::FilePath)]
        html: PathBuf,
    },
}
