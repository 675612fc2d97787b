//! Per-unit device model and cumulative counters.

use crate::ServiceProfile;
use poolsim_core::PoolId;
use poolsim_types::{DeviceId, DeviceState, StageKind};
use serde::Serialize;
use std::time::Duration;

/// Cumulative counters for one device unit, updated as batches finish
/// service and as failures occur.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceCounters {
    /// Batches this unit has finished servicing.
    pub processed_count: u64,

    /// Total time spent servicing batches.
    pub busy_time: Duration,

    /// Failures the unit has suffered.
    pub failure_count: u64,
}

/// One physical unit on the line.
#[derive(Debug)]
pub struct DeviceModel {
    /// Unit identifier, unique across the fleet.
    pub id: DeviceId,

    /// Unit name, e.g. `centrifuge-2`.
    pub name: String,

    /// The stage this unit serves.
    pub kind: StageKind,

    /// Kernel pool arbitrating access to this unit's slots.
    pub pool: PoolId,

    /// Service-time distribution.
    pub profile: ServiceProfile,

    /// Cumulative counters.
    pub counters: DeviceCounters,

    /// Batches currently in service at this unit.
    in_service: usize,

    /// Whether a failure is being repaired.
    under_repair: bool,
}

impl DeviceModel {
    pub fn new(id: DeviceId, unit_index: usize, kind: StageKind, pool: PoolId) -> Self {
        Self {
            id,
            name: format!("{}-{}", kind.device_label(), unit_index + 1),
            kind,
            pool,
            profile: ServiceProfile::for_stage(kind),
            counters: DeviceCounters::default(),
            in_service: 0,
            under_repair: false,
        }
    }

    /// Observable state, repair taking precedence over processing.
    pub fn state(&self) -> DeviceState {
        if self.under_repair {
            DeviceState::UnderRepair
        } else if self.in_service > 0 {
            DeviceState::Processing
        } else {
            DeviceState::Idle
        }
    }

    /// A batch entered service at this unit.
    pub fn begin_service(&mut self) {
        self.in_service += 1;
    }

    /// A batch finished service; fold the service time into the
    /// counters.
    pub fn finish_service(&mut self, service_time: Duration) {
        assert!(self.in_service > 0, "finish_service with nothing in service");
        self.in_service -= 1;
        self.counters.processed_count += 1;
        self.counters.busy_time += service_time;
    }

    /// The unit failed; repair begins now.
    pub fn mark_failed(&mut self) {
        self.counters.failure_count += 1;
        self.under_repair = true;
    }

    /// Repair finished.
    pub fn mark_repaired(&mut self) {
        self.under_repair = false;
    }

    pub fn is_under_repair(&self) -> bool {
        self.under_repair
    }

    /// Fraction of `elapsed` this unit spent servicing batches.
    pub fn utilization(&self, elapsed: Duration) -> f64 {
        if elapsed.is_zero() {
            return 0.0;
        }
        self.counters.busy_time.as_secs_f64() / elapsed.as_secs_f64()
    }

    /// Batches serviced per second of `elapsed`.
    pub fn throughput(&self, elapsed: Duration) -> f64 {
        if elapsed.is_zero() {
            return 0.0;
        }
        self.counters.processed_count as f64 / elapsed.as_secs_f64()
    }

    /// Failures per second of `elapsed`.
    pub fn failure_rate(&self, elapsed: Duration) -> f64 {
        if elapsed.is_zero() {
            return 0.0;
        }
        self.counters.failure_count as f64 / elapsed.as_secs_f64()
    }
}
