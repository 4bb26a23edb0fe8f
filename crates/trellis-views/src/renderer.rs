//! Rendering a compiled unit into a sink.

use std::io::{self, Write};

use crate::compiler::CompiledUnit;
use crate::context::RenderContext;
use crate::error::RenderError;

/// Writer that keeps the first I/O error so it can be told apart from
/// template failures after the engine has wrapped it.
struct TrackingWriter<W> {
    inner: W,
    error: Option<io::Error>,
}

impl<W: Write> Write for TrackingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).map_err(|e| self.keep(e))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(|e| self.keep(e))
    }
}

impl<W> TrackingWriter<W> {
    fn keep(&mut self, e: io::Error) -> io::Error {
        let kind = e.kind();
        if self.error.is_none() {
            self.error = Some(e);
        }
        io::Error::from(kind)
    }
}

impl CompiledUnit {
    /// Render `block` of this unit with `ctx` into `sink`.
    ///
    /// The region name renders the whole document. Output is streamed, so a
    /// failure partway leaves partial output in the sink.
    pub fn render<W: Write>(
        &self,
        block: &str,
        ctx: &RenderContext,
        sink: W,
    ) -> Result<(), RenderError> {
        let unit = self.name.as_str();
        if !self.has_block(block) {
            return Err(RenderError::UnknownBlock {
                unit: unit.to_owned(),
                block: block.to_owned(),
            });
        }

        let execution = |source| RenderError::Execution {
            unit: unit.to_owned(),
            source,
        };
        let template = self.env.get_template(unit).map_err(execution)?;
        let mut writer = TrackingWriter {
            inner: sink,
            error: None,
        };

        let result = if block == self.region {
            template.render_to_write(ctx, &mut writer).map(drop)
        } else {
            template
                .eval_to_state(ctx)
                .and_then(|mut state| state.render_block(block))
                .map(|output| {
                    // Failures are kept by the tracking writer
                    let _ = writer.write_all(output.as_bytes());
                })
        };

        if let Some(source) = writer.error.take() {
            return Err(RenderError::Write {
                unit: unit.to_owned(),
                source,
            });
        }
        result.map_err(execution)?;
        writer.inner.flush().map_err(|source| RenderError::Write {
            unit: unit.to_owned(),
            source,
        })
    }
}
