//! Buffered output for the sink stage.

use crate::error::{PipelineError, Result};
use crate::line::Line;
use std::io::{BufWriter, Write};

/// Buffered writer that emits Lines verbatim and counts what it wrote.
pub struct LineWriter<W: Write> {
    writer: BufWriter<W>,
    lines_written: u64,
    bytes_written: u64,
}

impl<W: Write> LineWriter<W> {
    /// Create a new LineWriter with the given buffer size.
    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            lines_written: 0,
            bytes_written: 0,
        }
    }

    /// Write a Line exactly as it was read.
    #[inline]
    pub fn write_line(&mut self, line: &Line) -> Result<()> {
        self.writer
            .write_all(line.as_bytes())
            .map_err(|source| PipelineError::Write { source })?;
        self.lines_written += 1;
        self.bytes_written += line.len() as u64;
        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Flush buffered bytes and release the underlying stream.
    pub fn finish(mut self) -> Result<W> {
        self.writer
            .flush()
            .map_err(|source| PipelineError::Write { source })?;
        self.writer
            .into_inner()
            .map_err(|e| PipelineError::Write {
                source: e.into_error(),
            })
    }
}
