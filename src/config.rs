//! Runtime configuration for a header-stripping pipeline.
//!
//! Every bound that a fixed-size implementation would bake in at compile
//! time (line length, sentinel text, buffer sizing) lives here instead, so
//! one binary can serve differently shaped inputs without changing the
//! hand-off protocol.

use crate::error::{PipelineError, Result};
use crate::streaming::buffers;

/// Sentinel line that ends the header region in the reference data.
pub const DEFAULT_SENTINEL: &str = "end_header";

/// Default maximum Line size in bytes, terminator included.
pub const DEFAULT_MAX_LINE_LEN: usize = 255;

/// Upper bound for `max_line_len` (frames carry a u32 length but a
/// single in-flight line should never need more than this).
pub const MAX_LINE_LIMIT: usize = 16 * 1024 * 1024;

/// How a Line is compared against the sentinel marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The line, minus its `\n` or `\r\n` terminator, equals the sentinel.
    #[default]
    Exact,
    /// The line contains the sentinel anywhere.
    Contains,
}

/// What the source does with a physical line longer than `max_line_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Deliver the line as consecutive chunks of at most `max_line_len` bytes.
    #[default]
    Split,
    /// Abort the run with [`PipelineError::LineTooLong`].
    Reject,
}

/// Configuration shared by the coordinator and all three stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Literal line content that ends the header region.
    pub sentinel: Vec<u8>,
    /// Sentinel comparison rule.
    pub match_mode: MatchMode,
    /// Maximum bytes per Line, terminator included.
    pub max_line_len: usize,
    /// Handling of physical lines longer than `max_line_len`.
    pub overflow: OverflowPolicy,
    /// Use smaller I/O buffers.
    pub low_memory: bool,
    /// Record every ring activation (see [`crate::handoff::RingMonitor::trace`]).
    pub trace_handoffs: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.as_bytes().to_vec(),
            match_mode: MatchMode::Exact,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            overflow: OverflowPolicy::Split,
            low_memory: false,
            trace_handoffs: false,
        }
    }

    /// Set the sentinel marker.
    pub fn with_sentinel(mut self, sentinel: impl Into<Vec<u8>>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    /// Set the sentinel comparison rule.
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Set the maximum Line size in bytes.
    pub fn with_max_line_len(mut self, len: usize) -> Self {
        self.max_line_len = len;
        self
    }

    /// Set the long-line policy.
    pub fn with_overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = policy;
        self
    }

    /// Select the low-memory buffer sizes.
    pub fn with_low_memory(mut self, low_memory: bool) -> Self {
        self.low_memory = low_memory;
        self
    }

    /// Enable the ring activation trace.
    pub fn with_trace_handoffs(mut self, trace: bool) -> Self {
        self.trace_handoffs = trace;
        self
    }

    /// Size of one transport frame for this configuration.
    #[inline]
    pub fn frame_size(&self) -> usize {
        crate::transport::frame_size(self.max_line_len)
    }

    #[inline]
    pub fn input_buffer_size(&self) -> usize {
        buffers::input_buffer_size(self.low_memory)
    }

    #[inline]
    pub fn output_buffer_size(&self) -> usize {
        buffers::output_buffer_size(self.low_memory)
    }

    /// Check the configuration before any stage is started.
    pub fn validate(&self) -> Result<()> {
        if self.sentinel.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "sentinel must not be empty".to_string(),
            ));
        }
        if memchr::memchr2(b'\n', b'\r', &self.sentinel).is_some() {
            return Err(PipelineError::InvalidConfig(
                "sentinel must not contain a line terminator".to_string(),
            ));
        }
        // A sentinel line plus CRLF must fit in one Line or it could be split.
        let min = self.sentinel.len() + 2;
        if self.max_line_len < min {
            return Err(PipelineError::InvalidConfig(format!(
                "max line length {} is shorter than the sentinel line ({} bytes)",
                self.max_line_len, min
            )));
        }
        if self.max_line_len > MAX_LINE_LIMIT {
            return Err(PipelineError::InvalidConfig(format!(
                "max line length {} exceeds the limit of {} bytes",
                self.max_line_len, MAX_LINE_LIMIT
            )));
        }
        Ok(())
    }
}
