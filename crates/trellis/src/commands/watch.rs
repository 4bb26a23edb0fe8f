//! `trellis watch` command implementation.

use std::time::Duration;

use clap::Args;
use trellis_templates::load_views;
use trellis_views::DEFAULT_QUIET_PERIOD;

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Quiet period in milliseconds before reloading after a change.
    #[arg(long)]
    debounce_ms: Option<u64>,
}

impl WatchArgs {
    /// Execute the watch command. Runs until the process is interrupted.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial load fails or the watcher cannot start.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load()?;
        if !config.mode.dev {
            output.warning("Development mode is off; reloading anyway");
        }

        let handle = load_views(&config)?;
        output.success(&format!(
            "Loaded {} views from {}",
            handle.current().len(),
            config.views_dir.display()
        ));

        let quiet = self
            .debounce_ms
            .map_or(DEFAULT_QUIET_PERIOD, Duration::from_millis);
        let _watcher = handle.watch(quiet, |result| Output::new().reload(result))?;

        output.info("Watching for changes (Ctrl+C to stop)");
        loop {
            std::thread::park();
        }
    }
}
