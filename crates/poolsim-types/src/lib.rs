//! Foundational types shared across the pooling-line simulation crates.

mod batch;
mod stage;

pub use batch::{Batch, StageOutcome, StageRecord, TerminalState};
pub use stage::{StageKind, STAGE_COUNT, STAGE_ORDER};

use serde::Serialize;
use std::fmt;

/// Unique identifier for a batch moving through the line.
///
/// Assigned sequentially in arrival order, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BATCH-{:05}", self.0)
    }
}

/// Unique identifier for one physical device unit on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DEV-{:03}", self.0)
    }
}

/// Observable state of a device unit at a point in simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceState {
    /// No batch in service and not under repair.
    Idle,

    /// At least one batch currently in service.
    Processing,

    /// A failure has occurred and repair has not yet finished.
    UnderRepair,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceState::Idle => "idle",
            DeviceState::Processing => "processing",
            DeviceState::UnderRepair => "under-repair",
        };
        write!(f, "{s}")
    }
}
