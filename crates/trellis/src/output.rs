//! Colored terminal output on stderr.
//!
//! Stdout is reserved for rendered views.

use std::sync::Arc;

use console::{Style, Term};
use trellis_views::{CompiledUnit, LoadError, Registry};

/// Operator-facing messages.
pub(crate) struct Output {
    term: Term,
    ok: Style,
    warn: Style,
    fail: Style,
    muted: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red().bold(),
            muted: Style::new().dim(),
        }
    }

    fn line(&self, style: Option<&Style>, msg: &str) {
        let _ = match style {
            Some(style) => self.term.write_line(&style.apply_to(msg).to_string()),
            None => self.term.write_line(msg),
        };
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(None, msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(Some(&self.ok), msg);
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(Some(&self.warn), msg);
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(Some(&self.fail), msg);
    }

    /// One unit with its layout, then its partials indented and dimmed.
    pub(crate) fn unit(&self, unit: &CompiledUnit) {
        match unit.layout() {
            Some(layout) => self.info(&format!("{} < {layout}", unit.name())),
            None => self.info(&unit.name().to_string()),
        }
        for partial in unit.partials() {
            self.line(Some(&self.muted), &format!("    + {partial}"));
        }
    }

    /// Outcome of a reload triggered by the watcher.
    pub(crate) fn reload(&self, result: &Result<Arc<Registry>, LoadError>) {
        match result {
            Ok(registry) => self.success(&format!("Reloaded {} views", registry.len())),
            Err(e) => self.error(&format!("Reload failed, keeping previous views: {e}")),
        }
    }
}
