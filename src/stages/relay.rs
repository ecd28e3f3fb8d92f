//! Relay stage: moves frames from the transport into the shared buffer.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::handoff::RingSeat;
use crate::pipeline::SharedState;
use crate::transport::FrameReceiver;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    pub frames_relayed: u64,
}

/// Run the relay stage.
///
/// The first turn only rotates the ring. After that, each turn either
/// forwards end-of-stream (without touching the transport) or pulls one
/// frame and publishes its Line for the sink.
pub fn run_relay(
    seat: RingSeat,
    config: &PipelineConfig,
    shared: &SharedState,
    mut receiver: Box<dyn FrameReceiver>,
) -> Result<RelayReport> {
    seat.acquire()?.pass()?;

    let frame_size = config.frame_size();
    let mut report = RelayReport::default();

    loop {
        let permit = seat.acquire()?;
        if shared.stream_ended() {
            log::debug!(
                "relay: end of stream after {} frames",
                report.frames_relayed
            );
            permit.pass()?;
            return Ok(report);
        }

        let line = receiver.recv_frame()?.decode(frame_size)?;
        report.frames_relayed += 1;
        log::trace!(
            "relay: relayed frame {} ({} bytes)",
            report.frames_relayed,
            line.len()
        );
        shared.publish(line)?;
        permit.pass()?;
    }
}
