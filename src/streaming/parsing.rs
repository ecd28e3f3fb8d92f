//! Bounded line reading for the source stage.
//!
//! Lines are cut at `\n` with memchr straight out of the `BufReader`
//! buffer, so no line is ever held in memory beyond the configured
//! maximum length.

use crate::config::OverflowPolicy;
use crate::error::{PipelineError, Result};
use crate::line::Line;
use memchr::memchr;
use std::io::{self, BufRead, BufReader, Read};

/// Reads Lines of at most `max_len` bytes (terminator included).
pub struct LineReader<R: Read> {
    reader: BufReader<R>,
    max_len: usize,
    overflow: OverflowPolicy,
    /// Physical lines started so far (1-based number of the current line).
    line_number: u64,
    /// The previous Line was a split chunk of a longer physical line.
    mid_line: bool,
}

impl<R: Read> LineReader<R> {
    /// Create a reader with the given buffer capacity.
    pub fn with_capacity(
        inner: R,
        capacity: usize,
        max_len: usize,
        overflow: OverflowPolicy,
    ) -> Self {
        debug_assert!(max_len > 0);
        Self {
            reader: BufReader::with_capacity(capacity, inner),
            max_len,
            overflow,
            line_number: 0,
            mid_line: false,
        }
    }

    /// Physical line number of the most recently returned Line.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Read the next Line, or `None` at end of input.
    ///
    /// Chunks following the first piece of a split line come back marked
    /// as continuations.
    pub fn read_line(&mut self) -> Result<Option<Line>> {
        let continuation = self.mid_line;
        let mut buf = Vec::with_capacity(self.max_len.min(256));

        loop {
            let available = match self.reader.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(PipelineError::Read { source }),
            };
            if available.is_empty() {
                break;
            }
            if buf.is_empty() && !self.mid_line {
                self.line_number += 1;
            }

            let room = self.max_len - buf.len();
            let window = &available[..available.len().min(room)];
            if let Some(pos) = memchr(b'\n', window) {
                buf.extend_from_slice(&window[..=pos]);
                self.reader.consume(pos + 1);
                self.mid_line = false;
                return Ok(Some(chunk(buf, continuation)));
            }

            let taken = window.len();
            buf.extend_from_slice(window);
            self.reader.consume(taken);

            if buf.len() == self.max_len {
                return self.overflowed(buf, continuation);
            }
        }

        if buf.is_empty() {
            Ok(None)
        } else {
            self.mid_line = false;
            Ok(Some(chunk(buf, continuation)))
        }
    }

    /// Buffer is full and no terminator was seen yet.
    fn overflowed(&mut self, buf: Vec<u8>, continuation: bool) -> Result<Option<Line>> {
        let at_eof = loop {
            match self.reader.fill_buf() {
                Ok(bytes) => break bytes.is_empty(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(PipelineError::Read { source }),
            }
        };
        if at_eof {
            self.mid_line = false;
            return Ok(Some(chunk(buf, continuation)));
        }

        match self.overflow {
            OverflowPolicy::Reject => Err(PipelineError::LineTooLong {
                line: self.line_number,
                limit: self.max_len,
            }),
            OverflowPolicy::Split => {
                log::trace!(
                    "line {} longer than {} bytes, splitting",
                    self.line_number,
                    self.max_len
                );
                self.mid_line = true;
                Ok(Some(chunk(buf, continuation)))
            }
        }
    }
}

fn chunk(buf: Vec<u8>, continuation: bool) -> Line {
    if continuation {
        Line::continuation(buf)
    } else {
        Line::new(buf)
    }
}
