//! `pagekiln` runs a rendering engine and assembles the static site it describes.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pagekiln_engine::RenderMode;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "pagekiln")]
#[command(about = "Pre-render a site with an external engine and assemble the static output")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to pagekiln.toml config file
    #[arg(short, long, default_value = "pagekiln.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default pagekiln.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        yes: bool,
    },

    /// Build the static site
    Build {
        /// Output directory (defaults to config or "dist")
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render mode passed to the engine (prerender, dev, prod)
        #[arg(short, long)]
        mode: Option<RenderMode>,
    },

    /// Preview the built site
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Directory to serve
        #[arg(short, long, default_value = "dist")]
        dir: PathBuf,

        /// Do not open browser
        #[arg(long)]
        no_open: bool,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init { yes } => commands::init::run(&cli.config, yes).await,
        Commands::Build { output, mode } => commands::build::run(&cli.config, output, mode).await,
        Commands::Serve { port, dir, no_open } => commands::serve::run(port, dir, !no_open).await,
    }
}
