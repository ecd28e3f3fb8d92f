//! Sink stage: header-skip filtering and output.

use crate::config::PipelineConfig;
use crate::endpoint::Output;
use crate::error::{PipelineError, Result};
use crate::handoff::RingSeat;
use crate::header::{HeaderFilter, HeaderState, SentinelMatcher, Verdict};
use crate::pipeline::SharedState;
use crate::streaming::LineWriter;

/// What the sink did during a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SinkReport {
    pub header_lines_skipped: u64,
    pub sentinel_line: Option<u64>,
    pub lines_written: u64,
    pub bytes_written: u64,
}

/// Run the sink stage.
///
/// Opens (truncates) the output during its first turn and releases the
/// source's first read. Each later turn consumes the shared Line and
/// either drops it (header, sentinel) or writes it (body). When the
/// end-of-stream flag is seen it flushes and closes the output and stops
/// without passing its permission on.
pub fn run_sink(
    seat: RingSeat,
    output: Output,
    config: &PipelineConfig,
    shared: &SharedState,
) -> Result<SinkReport> {
    let permit = seat.acquire()?;
    let label = output.to_string();
    let writer = output.open()?;
    let mut writer = LineWriter::with_capacity(config.output_buffer_size(), writer);
    log::debug!("sink: opened output {}", label);
    permit.pass()?;

    let mut filter = HeaderFilter::new(SentinelMatcher::from_config(config));
    let mut report = SinkReport::default();
    let mut position: u64 = 0;

    loop {
        let permit = seat.acquire()?;

        if shared.stream_ended() {
            if !shared.is_empty()? {
                return Err(PipelineError::ProtocolViolation(
                    "end of stream reached the sink with a line still buffered".to_string(),
                ));
            }
            if filter.terminate() == HeaderState::InHeader {
                log::warn!(
                    "input ended without a sentinel line; all {} lines treated as header",
                    position
                );
            }
            report.lines_written = writer.lines_written();
            report.bytes_written = writer.bytes_written();
            drop(writer.finish()?);
            log::debug!(
                "sink: wrote {} lines, closed output {}",
                report.lines_written,
                label
            );
            // Terminal: the permission stays here.
            drop(permit);
            return Ok(report);
        }

        let line = shared.take()?;
        position += 1;
        match filter.classify(&line)? {
            Verdict::Skip => {
                report.header_lines_skipped += 1;
                log::trace!("sink: skipped header line {}", position);
            }
            Verdict::Sentinel => {
                report.sentinel_line = Some(position);
                log::debug!("sink: reached sentinel at line {}", position);
            }
            Verdict::Emit => {
                writer.write_line(&line)?;
                log::trace!("sink: wrote line {}", position);
            }
        }
        permit.pass()?;
    }
}
