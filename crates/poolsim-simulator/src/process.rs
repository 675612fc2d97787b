//! Process tokens for the pipeline state machines.
//!
//! Each token encodes a resumption point. Dispatching a token runs one
//! step of its state machine and yields effects for the kernel; no
//! stack survives across suspensions.

use poolsim_types::{BatchId, StageKind};
use std::time::Duration;

/// A suspended pipeline process.
#[derive(Debug, Clone, PartialEq)]
pub enum Process {
    /// The arrival generator. Each dispatch admits one batch and
    /// reschedules itself; it never terminates.
    ArrivalTick,

    /// One batch's walk through the line, one stage at a time.
    Journey {
        batch: BatchId,
        stage: StageKind,
        phase: JourneyPhase,
    },

    /// One unit's failure/repair loop; it never terminates.
    FailureCycle { device: usize, phase: FailurePhase },
}

/// Resumption points of a batch's visit to one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum JourneyPhase {
    /// Select a unit and request admission.
    Enter,

    /// Admission granted; record the queue wait and start service.
    Service { unit: usize, queued_at: Duration },

    /// Service finished; synthesize the outcome and route onward.
    Finish { unit: usize, started_at: Duration },
}

/// Resumption points of a unit's failure/repair loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailurePhase {
    /// The failure instant has arrived.
    Fail,

    /// Admission granted (blocking repair only); the unit goes down
    /// now.
    BeginRepair,

    /// Repair has finished; the unit comes back up.
    Restore,
}
