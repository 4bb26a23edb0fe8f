//! `trellis check` command implementation.

use clap::Args;
use trellis_templates::load_views;

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// List every view with its layout and partials.
    #[arg(short, long)]
    list: bool,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or any view fails to compile.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load()?;

        output.info(&format!("Views directory: {}", config.views_dir.display()));
        let registry = load_views(&config)?.current();

        if self.list {
            for unit in registry.units() {
                output.unit(unit);
            }
        }

        if registry.is_empty() {
            output.warning("No views found");
        } else {
            output.success(&format!("{} views compiled", registry.len()));
        }
        Ok(())
    }
}
