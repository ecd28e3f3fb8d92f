//! The hand-off ring: three single-owner permissions passed round
//! source → relay → sink → source.
//!
//! Each permission is a one-slot crossbeam channel carrying a unit token.
//! Exactly one token circulates, so exactly one stage can hold a
//! permission at any instant:
//!
//! ```text
//!   P_AB: released by sink,   acquired by source   (starts available)
//!   P_BC: released by source, acquired by relay
//!   P_CA: released by relay,  acquired by sink
//! ```
//!
//! A stage owns its [`RingSeat`]: the receiving end of the permission it
//! acquires and the sending end of the one it releases. When a stage
//! returns early its seat is dropped, both channels disconnect, and the
//! blocked neighbours wake with [`PipelineError::Cancelled`] instead of
//! waiting forever. The cancellation then travels round the ring.

use crate::error::{PipelineError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

/// One of the three pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Source,
    Relay,
    Sink,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Source, Stage::Relay, Stage::Sink];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Stage::Source => 0,
            Stage::Relay => 1,
            Stage::Sink => 2,
        }
    }

    /// Stage activated after this one.
    #[inline]
    pub fn next(self) -> Stage {
        match self {
            Stage::Source => Stage::Relay,
            Stage::Relay => Stage::Sink,
            Stage::Sink => Stage::Source,
        }
    }

    /// Permission this stage waits on.
    #[inline]
    pub fn permission(self) -> Permission {
        match self {
            Stage::Source => Permission::AB,
            Stage::Relay => Permission::BC,
            Stage::Sink => Permission::CA,
        }
    }

    fn from_index(index: u8) -> Option<Stage> {
        match index {
            0 => Some(Stage::Source),
            1 => Some(Stage::Relay),
            2 => Some(Stage::Sink),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Source => "source",
            Stage::Relay => "relay",
            Stage::Sink => "sink",
        })
    }
}

/// A hand-off permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    AB,
    BC,
    CA,
}

impl Permission {
    /// Stage that blocks on this permission.
    pub fn acquirer(self) -> Stage {
        match self {
            Permission::AB => Stage::Source,
            Permission::BC => Stage::Relay,
            Permission::CA => Stage::Sink,
        }
    }

    /// Stage that makes this permission available.
    pub fn releaser(self) -> Stage {
        match self {
            Permission::AB => Stage::Sink,
            Permission::BC => Stage::Source,
            Permission::CA => Stage::Relay,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Permission::AB => "P_AB",
            Permission::BC => "P_BC",
            Permission::CA => "P_CA",
        })
    }
}

const NO_HOLDER: u8 = u8::MAX;

/// Observes the ring: who holds a permission, how often each stage ran,
/// and optionally the full activation order.
#[derive(Debug)]
pub struct RingMonitor {
    holder: AtomicU8,
    activations: [AtomicU64; 3],
    trace: Option<Mutex<Vec<Stage>>>,
}

impl RingMonitor {
    fn new(record_trace: bool) -> Self {
        Self {
            holder: AtomicU8::new(NO_HOLDER),
            activations: [AtomicU64::new(0), AtomicU64::new(0), AtomicU64::new(0)],
            trace: record_trace.then(|| Mutex::new(Vec::new())),
        }
    }

    /// Stage currently holding a permission, if any.
    pub fn holder(&self) -> Option<Stage> {
        Stage::from_index(self.holder.load(Ordering::Acquire))
    }

    /// Number of times `stage` has acquired its permission.
    pub fn activations(&self, stage: Stage) -> u64 {
        self.activations[stage.index()].load(Ordering::Acquire)
    }

    /// Activation order, when tracing was enabled.
    pub fn trace(&self) -> Option<Vec<Stage>> {
        self.trace
            .as_ref()
            .map(|t| t.lock().map(|v| v.clone()).unwrap_or_default())
    }

    fn enter(&self, stage: Stage) -> Result<()> {
        let me = stage.index() as u8;
        if let Err(current) =
            self.holder
                .compare_exchange(NO_HOLDER, me, Ordering::AcqRel, Ordering::Acquire)
        {
            return Err(PipelineError::ProtocolViolation(format!(
                "{} acquired {} while {} was still active",
                stage,
                stage.permission(),
                Stage::from_index(current)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "an unknown stage".to_string())
            )));
        }
        self.activations[stage.index()].fetch_add(1, Ordering::AcqRel);
        if let Some(trace) = &self.trace {
            if let Ok(mut trace) = trace.lock() {
                trace.push(stage);
            }
        }
        Ok(())
    }

    fn leave(&self, stage: Stage) -> Result<()> {
        let me = stage.index() as u8;
        self.holder
            .compare_exchange(me, NO_HOLDER, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| {
                PipelineError::ProtocolViolation(format!(
                    "{} released a permission it did not hold",
                    stage
                ))
            })
    }
}

/// The three permissions, before they are handed to their stages.
pub struct HandoffRing {
    source: RingSeat,
    relay: RingSeat,
    sink: RingSeat,
    monitor: Arc<RingMonitor>,
}

impl HandoffRing {
    /// Build the ring with `P_AB` available and the others unavailable.
    pub fn new(record_trace: bool) -> Self {
        let monitor = Arc::new(RingMonitor::new(record_trace));
        let (ab_tx, ab_rx) = bounded::<()>(1);
        let (bc_tx, bc_rx) = bounded::<()>(1);
        let (ca_tx, ca_rx) = bounded::<()>(1);

        // Cannot fail: the channel is empty and its receiver is alive.
        let _ = ab_tx.try_send(());

        let seat = |stage: Stage, own: Receiver<()>, next: Sender<()>| RingSeat {
            stage,
            own,
            next,
            monitor: Arc::clone(&monitor),
        };
        Self {
            source: seat(Stage::Source, ab_rx, bc_tx),
            relay: seat(Stage::Relay, bc_rx, ca_tx),
            sink: seat(Stage::Sink, ca_rx, ab_tx),
            monitor: Arc::clone(&monitor),
        }
    }

    pub fn monitor(&self) -> Arc<RingMonitor> {
        Arc::clone(&self.monitor)
    }

    /// Hand out the seats as (source, relay, sink).
    pub fn into_seats(self) -> (RingSeat, RingSeat, RingSeat) {
        (self.source, self.relay, self.sink)
    }
}

/// A stage's place in the ring.
pub struct RingSeat {
    stage: Stage,
    own: Receiver<()>,
    next: Sender<()>,
    monitor: Arc<RingMonitor>,
}

impl RingSeat {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Block until this stage's permission is released to it.
    pub fn acquire(&self) -> Result<Permit<'_>> {
        self.own
            .recv()
            .map_err(|_| PipelineError::Cancelled { stage: self.stage })?;
        self.monitor.enter(self.stage)?;
        Ok(Permit {
            seat: self,
            passed: false,
        })
    }
}

/// Proof that a stage holds its permission.
///
/// [`Permit::pass`] releases the next permission in the ring. Dropping a
/// permit without passing it releases nothing, which is how the terminal
/// state and the failure path end a stage.
#[must_use = "a permit must be passed on, or dropped to stop the ring"]
pub struct Permit<'a> {
    seat: &'a RingSeat,
    passed: bool,
}

impl Permit<'_> {
    pub fn stage(&self) -> Stage {
        self.seat.stage
    }

    /// Release the next stage's permission.
    pub fn pass(mut self) -> Result<()> {
        self.passed = true;
        let stage = self.seat.stage;
        self.seat.monitor.leave(stage)?;
        match self.seat.next.try_send(()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(())) => Err(PipelineError::ProtocolViolation(format!(
                "{} released {} but it was already available",
                stage,
                stage.next().permission()
            ))),
            Err(TrySendError::Disconnected(())) => Err(PipelineError::Cancelled { stage }),
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.passed {
            let _ = self.seat.monitor.leave(self.seat.stage);
        }
    }
}
