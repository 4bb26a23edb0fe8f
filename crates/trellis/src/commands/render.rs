//! `trellis render` command implementation.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use trellis_templates::{ControllerSettings, Outcome, RecordedResponse, Templates, load_views};
use trellis_views::{RenderContext, ViewEngine};

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// View name, e.g. `App/Index.html`.
    name: String,

    /// Render only this block instead of the whole document.
    #[arg(short, long)]
    block: Option<String>,

    /// Context variable as `key=value` (repeatable).
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,

    /// JSON file with a top-level object of context variables.
    #[arg(long, value_name = "FILE")]
    context: Option<PathBuf>,

    /// Print the status line and headers before the body.
    #[arg(short, long)]
    include: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// Whole documents go through the templates controller, so a failing
    /// view produces the same error page a server would send.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails, the context is invalid, or the
    /// view could not be rendered as requested.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load()?;
        let ctx = build_context(self.context.as_deref(), &self.vars)?;
        let handle = load_views(&config)?;

        let mut stdout = io::stdout().lock();

        if let Some(block) = &self.block {
            let mut body = Vec::new();
            handle.render_view(&self.name, block, &ctx, &mut body)?;
            stdout.write_all(&body)?;
            return Ok(());
        }

        let templates = Templates::new(handle, ControllerSettings::from_config(&config));
        let view = templates.render_template(self.name.as_str(), ctx);
        let mut response = RecordedResponse::new();
        let outcome = templates.respond(&view, &mut response);

        if self.include {
            writeln!(stdout, "{}", response.status)?;
            for (name, value) in &response.headers {
                writeln!(stdout, "{name}: {value}")?;
            }
            writeln!(stdout)?;
        }
        stdout.write_all(&response.body)?;
        stdout.flush()?;

        match outcome {
            Outcome::Rendered { .. } | Outcome::Redirected { .. } => Ok(()),
            Outcome::ErrorPage { cause, .. } => {
                output.warning("Rendered the internal error page instead");
                Err(cause.into())
            }
            Outcome::FixedBody { cause, .. } => Err(cause.into()),
        }
    }
}

/// Build a render context from a JSON file and `key=value` pairs.
///
/// Pairs are applied after the file, so they win on conflicts.
fn build_context(file: Option<&Path>, vars: &[String]) -> Result<RenderContext, CliError> {
    let mut ctx = RenderContext::new();

    if let Some(file) = file {
        let content = fs::read_to_string(file)?;
        let serde_json::Value::Object(values) = serde_json::from_str::<serde_json::Value>(&content)? else {
            return Err(CliError::Validation(format!(
                "{} must contain a JSON object",
                file.display()
            )));
        };
        for (key, value) in values {
            ctx.insert(key, value);
        }
    }

    for var in vars {
        let (key, value) = var
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| CliError::Validation(format!("Expected KEY=VALUE, got {var:?}")))?;
        ctx.insert(key, value);
    }

    Ok(ctx)
}
