//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod render;
pub(crate) mod watch;

use std::path::PathBuf;

use clap::Args;
use trellis_config::{CliSettings, Config};

use crate::error::CliError;

pub(crate) use check::CheckArgs;
pub(crate) use render::RenderArgs;
pub(crate) use watch::WatchArgs;

/// Configuration arguments shared by every command.
#[derive(Args)]
pub(crate) struct ConfigArgs {
    /// Path to configuration file (default: auto-discover trellis.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Views directory (overrides config).
    #[arg(long, env = "TRELLIS_VIEWS")]
    views_dir: Option<PathBuf>,

    /// Enable development mode (overrides config).
    #[arg(long)]
    dev: bool,
}

impl ConfigArgs {
    /// Load the configuration with command-line overrides applied.
    pub(crate) fn load(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            views_dir: self.views_dir.clone(),
            dev_mode: self.dev.then_some(true),
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}
