//! View selection and responding with fallbacks.
//!
//! Actions build a [`View`] describing what to render. [`Templates::respond`]
//! turns it into a response, falling back to the internal-error page and
//! finally to a fixed body when rendering fails.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use trellis_views::{RenderContext, RenderError, ViewEngine};

use crate::response::ResponseSink;
use crate::settings::ControllerSettings;

/// Body written when even the internal-error page cannot be rendered.
pub const INTERNAL_ERROR_BODY: &str = "500 Internal Server Error";

pub const STATUS_OK: u16 = 200;
pub const STATUS_SEE_OTHER: u16 = 303;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// What a view produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Render the named template.
    Template(String),
    /// Redirect to a location with `303 See Other`.
    Redirect(String),
}

/// Result of an action, waiting to be written to a sink.
#[derive(Debug, Clone)]
pub struct View {
    pub target: Target,
    pub status: u16,
    pub context: RenderContext,
}

impl View {
    /// Template name, unless this view is a redirect.
    pub fn template(&self) -> Option<&str> {
        match &self.target {
            Target::Template(name) => Some(name),
            Target::Redirect(_) => None,
        }
    }
}

/// Which branch [`Templates::respond`] took.
#[derive(Debug)]
pub enum Outcome {
    /// The view rendered as requested.
    Rendered { name: String, status: u16 },
    /// A redirect was written.
    Redirected { location: String },
    /// The view failed; the internal-error page was rendered instead.
    ErrorPage { name: String, cause: RenderError },
    /// The view and the internal-error page both failed, or the view was the
    /// internal-error page itself; the fixed body was written.
    FixedBody { name: String, cause: RenderError },
}

impl Outcome {
    /// Status code written to the sink.
    pub fn status(&self) -> u16 {
        match self {
            Self::Rendered { status, .. } => *status,
            Self::Redirected { .. } => STATUS_SEE_OTHER,
            Self::ErrorPage { .. } | Self::FixedBody { .. } => STATUS_INTERNAL_ERROR,
        }
    }
}

/// Templates controller.
///
/// Cheap to clone; clones share the engine.
#[derive(Clone)]
pub struct Templates {
    engine: Arc<dyn ViewEngine>,
    settings: ControllerSettings,
}

impl Templates {
    pub fn new(engine: Arc<dyn ViewEngine>, settings: ControllerSettings) -> Self {
        Self { engine, settings }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Default template name for an action, from the name pattern.
    ///
    /// With the default pattern, `("App", "Index")` gives `App/Index.html`.
    pub fn default_name(&self, controller: &str, action: &str) -> String {
        format_pattern(&self.settings.default_pattern, controller, action)
    }

    /// Render the action's default template with status 200.
    pub fn render(&self, controller: &str, action: &str, ctx: RenderContext) -> View {
        self.render_template(self.default_name(controller, action), ctx)
    }

    /// Render a template by name with status 200.
    pub fn render_template(&self, name: impl Into<String>, ctx: RenderContext) -> View {
        View {
            target: Target::Template(name.into()),
            status: STATUS_OK,
            context: ctx,
        }
    }

    /// Render the internal-error page with status 500.
    ///
    /// In development mode the error message is available as `error`.
    pub fn render_error(&self, err: &dyn fmt::Display, mut ctx: RenderContext) -> View {
        if self.settings.dev_mode {
            ctx.insert("error", err.to_string());
        }
        self.error_view(STATUS_INTERNAL_ERROR, ctx)
    }

    /// Render the not-found page with status 404. `messages` is available
    /// as `messages`.
    pub fn render_not_found<S: AsRef<str>>(
        &self,
        messages: &[S],
        mut ctx: RenderContext,
    ) -> View {
        let messages: Vec<&str> = messages.iter().map(AsRef::as_ref).collect();
        ctx.insert("messages", messages);
        self.error_view(STATUS_NOT_FOUND, ctx)
    }

    /// Redirect to `location` with `303 See Other`.
    pub fn redirect(&self, location: impl Into<String>) -> View {
        View {
            target: Target::Redirect(location.into()),
            status: STATUS_SEE_OTHER,
            context: RenderContext::new(),
        }
    }

    /// Name of the error page for `status`, e.g. `Errors/404.html`.
    pub fn error_page_name(&self, status: u16) -> String {
        format_pattern(
            &self.settings.default_pattern,
            &self.settings.errors_dir,
            &status.to_string(),
        )
    }

    fn error_view(&self, status: u16, ctx: RenderContext) -> View {
        View {
            target: Target::Template(self.error_page_name(status)),
            status,
            context: ctx,
        }
    }

    /// Write `view` to `sink`.
    ///
    /// Output is buffered, so a failed render never leaks partial output.
    /// Failures to write the body to the sink are logged.
    pub fn respond(&self, view: &View, sink: &mut dyn ResponseSink) -> Outcome {
        let name = match &view.target {
            Target::Redirect(location) => {
                sink.set_status(STATUS_SEE_OTHER);
                sink.set_header("Location", location);
                return Outcome::Redirected {
                    location: location.clone(),
                };
            }
            Target::Template(name) => name,
        };

        sink.set_header("Content-Type", &self.settings.content_type);

        let cause = match self.render_buffered(name, &view.context) {
            Ok(body) => {
                sink.set_status(view.status);
                write_body(sink, name, &body);
                return Outcome::Rendered {
                    name: name.clone(),
                    status: view.status,
                };
            }
            Err(cause) => cause,
        };
        tracing::error!(view = %name, error = %cause, "Failed to render view");

        sink.set_status(STATUS_INTERNAL_ERROR);

        let error_page = self.error_page_name(STATUS_INTERNAL_ERROR);
        if *name != error_page {
            let mut ctx = RenderContext::new();
            if self.settings.dev_mode {
                ctx.insert("error", cause.to_string());
            }
            match self.render_buffered(&error_page, &ctx) {
                Ok(body) => {
                    write_body(sink, &error_page, &body);
                    return Outcome::ErrorPage {
                        name: name.clone(),
                        cause,
                    };
                }
                Err(e) => {
                    tracing::error!(view = %error_page, error = %e, "Failed to render error page");
                }
            }
        }

        write_body(sink, name, INTERNAL_ERROR_BODY.as_bytes());
        Outcome::FixedBody {
            name: name.clone(),
            cause,
        }
    }

    fn render_buffered(&self, name: &str, ctx: &RenderContext) -> Result<Vec<u8>, RenderError> {
        let mut body = Vec::new();
        self.engine
            .render_view(name, self.engine.region(), ctx, &mut body)?;
        Ok(body)
    }
}

fn write_body(sink: &mut dyn ResponseSink, name: &str, body: &[u8]) {
    if let Err(e) = sink.write_all(body).and_then(|()| sink.flush()) {
        tracing::warn!(view = %name, error = %e, "Failed to write response body");
    }
}

/// Replace each `%v` in `pattern`, in order, with `first` then `second`.
///
/// Placeholders beyond the second are dropped.
fn format_pattern(pattern: &str, first: &str, second: &str) -> String {
    let mut parts = pattern.split("%v");
    let mut out = String::with_capacity(pattern.len() + first.len() + second.len());
    out.push_str(parts.next().unwrap_or_default());
    for (i, part) in parts.enumerate() {
        match i {
            0 => out.push_str(first),
            1 => out.push_str(second),
            _ => {}
        }
        out.push_str(part);
    }
    out
}
