//! Pipeline coordinator.
//!
//! Owns everything the three stages share: the hand-off ring, the
//! transport, the single-line buffer between relay and sink, and the
//! end-of-stream flag. Each stage runs on its own scoped thread and gets
//! these by reference or by move at spawn time; there is no global state.
//!
//! # Run order
//!
//! ```text
//! setup:  source opens input → relay → sink opens output → source
//! cycle:  source reads+pushes → relay pulls+publishes → sink filters+writes
//! end:    source sets flag → relay forwards → sink closes output
//! ```

use crate::config::PipelineConfig;
use crate::endpoint::{Input, Output};
use crate::error::{PipelineError, Result};
use crate::handoff::{HandoffRing, RingMonitor, Stage};
use crate::line::Line;
use crate::stages::{self, RelayReport, SinkReport, SourceReport};
use crate::transport::{self, FrameReceiver, FrameSender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, TryLockError};
use std::thread::{self, Scope, ScopedJoinHandle};

/// State shared between stages, accessed only by the permission holder.
///
/// Access uses `try_lock`: under the ring protocol the lock is never
/// contended, so contention is reported as a protocol violation rather
/// than waited out.
#[derive(Debug, Default)]
pub struct SharedState {
    buffer: Mutex<Option<Line>>,
    stream_end: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_buffer<T>(&self, f: impl FnOnce(&mut Option<Line>) -> Result<T>) -> Result<T> {
        match self.buffer.try_lock() {
            Ok(mut slot) => f(&mut slot),
            Err(TryLockError::WouldBlock) => Err(PipelineError::ProtocolViolation(
                "shared line buffer accessed by two stages at once".to_string(),
            )),
            Err(TryLockError::Poisoned(_)) => Err(PipelineError::ProtocolViolation(
                "shared line buffer poisoned by a panicked stage".to_string(),
            )),
        }
    }

    /// Relay side: place the next Line for the sink.
    pub fn publish(&self, line: Line) -> Result<()> {
        self.with_buffer(|slot| {
            if slot.is_some() {
                return Err(PipelineError::ProtocolViolation(
                    "relay overwrote a line the sink had not consumed".to_string(),
                ));
            }
            *slot = Some(line);
            Ok(())
        })
    }

    /// Sink side: consume the published Line.
    pub fn take(&self) -> Result<Line> {
        self.with_buffer(|slot| {
            slot.take().ok_or_else(|| {
                PipelineError::ProtocolViolation(
                    "sink activated with an empty line buffer".to_string(),
                )
            })
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.with_buffer(|slot| Ok(slot.is_none()))
    }

    /// Source side: record end of input. May happen only once.
    pub fn mark_stream_end(&self) -> Result<()> {
        if self.stream_end.swap(true, Ordering::AcqRel) {
            return Err(PipelineError::ProtocolViolation(
                "end of stream signalled twice".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn stream_ended(&self) -> bool {
        self.stream_end.load(Ordering::Acquire)
    }
}

/// Summary of a completed run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    /// Lines read from input
    pub lines_read: u64,
    /// Frames moved through the transport
    pub frames_relayed: u64,
    /// Header lines discarded (sentinel excluded)
    pub header_lines_skipped: u64,
    /// 1-based index of the sentinel Line, if it was seen
    pub sentinel_line: Option<u64>,
    /// Body lines written
    pub lines_written: u64,
    /// Body bytes written
    pub bytes_written: u64,
    /// Permission acquisitions per stage, indexed by [`Stage::index`]
    pub handoffs: [u64; 3],
    /// Activation order, when tracing was enabled
    pub trace: Option<Vec<Stage>>,
}

impl PipelineStats {
    fn collect(
        source: SourceReport,
        relay: RelayReport,
        sink: SinkReport,
        monitor: &RingMonitor,
    ) -> Self {
        Self {
            lines_read: source.lines_read,
            frames_relayed: relay.frames_relayed,
            header_lines_skipped: sink.header_lines_skipped,
            sentinel_line: sink.sentinel_line,
            lines_written: sink.lines_written,
            bytes_written: sink.bytes_written,
            handoffs: Stage::ALL.map(|s| monitor.activations(s)),
            trace: monitor.trace(),
        }
    }

    pub fn found_sentinel(&self) -> bool {
        self.sentinel_line.is_some()
    }

    pub fn handoffs(&self, stage: Stage) -> u64 {
        self.handoffs[stage.index()]
    }
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Read: {}, Relayed: {}, Header skipped: {}, ",
            self.lines_read, self.frames_relayed, self.header_lines_skipped
        )?;
        match self.sentinel_line {
            Some(line) => write!(f, "Sentinel: line {}, ", line)?,
            None => write!(f, "Sentinel: not found, ")?,
        }
        write!(
            f,
            "Written: {} ({} bytes), Hand-offs: {}/{}/{}",
            self.lines_written,
            self.bytes_written,
            self.handoffs[0],
            self.handoffs[1],
            self.handoffs[2]
        )
    }
}

/// A configured three-stage pipeline, ready to run once.
pub struct Pipeline {
    config: PipelineConfig,
    sender: Box<dyn FrameSender>,
    receiver: Box<dyn FrameReceiver>,
}

impl Pipeline {
    /// Pipeline with the in-process single-slot transport.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let (sender, receiver) = transport::channel();
        Self::with_transport(config, Box::new(sender), Box::new(receiver))
    }

    /// Pipeline with caller-supplied transport halves.
    pub fn with_transport(
        config: PipelineConfig,
        sender: Box<dyn FrameSender>,
        receiver: Box<dyn FrameReceiver>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sender,
            receiver,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all three stages to completion.
    ///
    /// On failure every stage is still joined; the error returned is the
    /// root cause, not the cancellations it triggered in the other stages.
    pub fn run(self, input: Input, output: Output) -> Result<PipelineStats> {
        let Pipeline {
            config,
            sender,
            receiver,
        } = self;

        let ring = HandoffRing::new(config.trace_handoffs);
        let monitor = ring.monitor();
        let (source_seat, relay_seat, sink_seat) = ring.into_seats();
        let shared = SharedState::new();
        let config = &config;
        let shared = &shared;

        log::debug!(
            "starting pipeline: {} -> {}, max line {} bytes",
            input,
            output,
            config.max_line_len
        );

        let (source, relay, sink) = thread::scope(|s| {
            let source = spawn_stage(s, Stage::Source, move || {
                stages::run_source(source_seat, input, config, shared, sender)
            });
            let relay = spawn_stage(s, Stage::Relay, move || {
                stages::run_relay(relay_seat, config, shared, receiver)
            });
            let sink = spawn_stage(s, Stage::Sink, move || {
                stages::run_sink(sink_seat, output, config, shared)
            });
            (
                join_stage(Stage::Source, source),
                join_stage(Stage::Relay, relay),
                join_stage(Stage::Sink, sink),
            )
        });

        match (source, relay, sink) {
            (Ok(source), Ok(relay), Ok(sink)) => {
                let stats = PipelineStats::collect(source, relay, sink, &monitor);
                log::debug!("pipeline finished: {}", stats);
                Ok(stats)
            }
            (source, relay, sink) => {
                let err = root_cause([source.err(), relay.err(), sink.err()]);
                log::error!("pipeline failed: {}", err);
                Err(err)
            }
        }
    }
}

fn spawn_stage<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    stage: Stage,
    body: F,
) -> Result<ScopedJoinHandle<'scope, Result<T>>>
where
    F: FnOnce() -> Result<T> + Send + 'scope,
    T: Send + 'scope,
{
    thread::Builder::new()
        .name(format!("headerless-{}", stage))
        .spawn_scoped(scope, body)
        .map_err(|source| PipelineError::Spawn { stage, source })
}

fn join_stage<T>(stage: Stage, handle: Result<ScopedJoinHandle<'_, Result<T>>>) -> Result<T> {
    handle?
        .join()
        .unwrap_or(Err(PipelineError::StagePanicked { stage }))
}

/// First error that is not an echo of another stage's failure.
fn root_cause(errors: [Option<PipelineError>; 3]) -> PipelineError {
    let mut cancellations = Vec::new();
    for err in errors.into_iter().flatten() {
        if err.is_cancellation() {
            cancellations.push(err);
        } else {
            return err;
        }
    }
    cancellations.into_iter().next().unwrap_or_else(|| {
        PipelineError::ProtocolViolation("pipeline failed without an error".to_string())
    })
}
