//! Source stage: reads Lines and pushes them into the transport.

use crate::config::PipelineConfig;
use crate::endpoint::Input;
use crate::error::Result;
use crate::handoff::RingSeat;
use crate::pipeline::SharedState;
use crate::streaming::LineReader;
use crate::transport::{Frame, FrameSender};

/// What the source did during a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceReport {
    pub lines_read: u64,
}

/// Run the source stage.
///
/// Opens the input during its first turn, then pushes one frame per turn.
/// At end of input it sets the end-of-stream flag instead of pushing,
/// closes the input and passes its permission one last time.
pub fn run_source(
    seat: RingSeat,
    input: Input,
    config: &PipelineConfig,
    shared: &SharedState,
    mut sender: Box<dyn FrameSender>,
) -> Result<SourceReport> {
    let permit = seat.acquire()?;
    let label = input.to_string();
    let reader = input.open()?;
    let mut lines = LineReader::with_capacity(
        reader,
        config.input_buffer_size(),
        config.max_line_len,
        config.overflow,
    );
    log::debug!("source: opened input {}", label);
    permit.pass()?;

    let frame_size = config.frame_size();
    let mut report = SourceReport::default();

    loop {
        let permit = seat.acquire()?;
        match lines.read_line()? {
            Some(line) => {
                sender.send_frame(Frame::encode(&line, frame_size)?)?;
                report.lines_read += 1;
                log::trace!(
                    "source: pushed line {} ({} bytes)",
                    report.lines_read,
                    line.len()
                );
                permit.pass()?;
            }
            None => {
                shared.mark_stream_end()?;
                drop(lines);
                log::debug!(
                    "source: end of input after {} lines, closed {}",
                    report.lines_read,
                    label
                );
                permit.pass()?;
                return Ok(report);
            }
        }
    }
}
