//! Error types shared by the pipeline stages and the transport.

use crate::handoff::Stage;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a frame transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport peer disconnected")]
    Disconnected,

    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors that can stop a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot open {role} '{}': {source}", path.display())]
    Open {
        role: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("error reading input: {source}")]
    Read { source: io::Error },

    #[error("error writing output: {source}")]
    Write { source: io::Error },

    #[error("line {line} exceeds the maximum line length of {limit} bytes")]
    LineTooLong { line: u64, limit: usize },

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("hand-off protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("{stage} stage cancelled after a neighbouring stage failed")]
    Cancelled { stage: Stage },

    #[error("{stage} stage panicked")]
    StagePanicked { stage: Stage },

    #[error("failed to spawn {stage} stage: {source}")]
    Spawn { stage: Stage, source: io::Error },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// True for errors that only echo a failure elsewhere in the ring.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
