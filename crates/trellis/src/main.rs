//! Trellis CLI - directory-cascading view templates.
//!
//! Provides commands for:
//! - `check`: Load a views tree and report compile errors
//! - `render`: Render one view to stdout
//! - `watch`: Reload a views tree on every change

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CheckArgs, RenderArgs, WatchArgs};
use output::Output;

/// Trellis - directory-cascading view templates.
#[derive(Parser)]
#[command(name = "trellis", version, about)]
struct Cli {
    /// Enable verbose output (show load and reload logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the views tree and report any compile errors.
    Check(CheckArgs),
    /// Render a view to stdout.
    Render(RenderArgs),
    /// Watch the views tree and reload on changes.
    Watch(WatchArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check(args) => args.execute(),
        Commands::Render(args) => args.execute(),
        Commands::Watch(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
