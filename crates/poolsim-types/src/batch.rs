//! Batch entity and its per-stage processing history.

use crate::{BatchId, DeviceId, StageKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Why a batch left the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminalState {
    /// All twelve stages completed.
    Completed,

    /// Rejected at the quality-control gate.
    Failed,
}

/// Result of one stage servicing one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutcome {
    /// Whether the stage operation itself succeeded. A `false` here is
    /// only terminal at the quality-control gate.
    pub success: bool,

    /// Gate verdict, `Some` only for the quality-control stage.
    pub qc_passed: Option<bool>,

    /// Named measurements produced by the device.
    pub measurements: Vec<(&'static str, f64)>,
}

impl StageOutcome {
    /// An outcome with no measurements, successful or not.
    pub fn new(success: bool) -> Self {
        Self {
            success,
            qc_passed: None,
            measurements: Vec::new(),
        }
    }

    /// Fetch a measurement by name.
    pub fn measurement(&self, name: &str) -> Option<f64> {
        self.measurements
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }
}

/// One completed stage visit in a batch's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    /// The stage that was visited.
    pub stage: StageKind,

    /// The device unit that performed the service.
    pub device: DeviceId,

    /// Simulation time when service started (queue wait excluded).
    pub start_time: Duration,

    /// Simulation time when service finished.
    pub end_time: Duration,

    /// What the device produced.
    pub outcome: StageOutcome,
}

impl StageRecord {
    /// Time the batch spent in service at this stage.
    pub fn service_time(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// A pooled platelet batch moving through the line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    /// Sequential identifier, assigned at arrival.
    pub id: BatchId,

    /// Simulation time the batch entered the line.
    pub arrival_time: Duration,

    /// Stage the batch is currently at or queued for. `None` once
    /// terminal.
    pub current_stage: Option<StageKind>,

    /// Completed stage visits, in visit order.
    pub stage_history: Vec<StageRecord>,

    /// Latest value of every measurement recorded so far, keyed by name.
    pub quality_metrics: BTreeMap<&'static str, f64>,

    /// Gate verdict once the quality-control stage has run.
    pub qc_passed: Option<bool>,

    /// Set exactly once, when the batch leaves the line.
    pub terminal_state: Option<TerminalState>,

    /// Simulation time the batch reached its terminal state.
    pub terminated_at: Option<Duration>,
}

impl Batch {
    /// Create a batch entering the line at `arrival_time`.
    pub fn new(id: BatchId, arrival_time: Duration) -> Self {
        Self {
            id,
            arrival_time,
            current_stage: Some(crate::STAGE_ORDER[0]),
            stage_history: Vec::new(),
            quality_metrics: BTreeMap::new(),
            qc_passed: None,
            terminal_state: None,
            terminated_at: None,
        }
    }

    /// Append a completed stage visit, folding its measurements into the
    /// batch quality metrics and capturing a gate verdict if present.
    pub fn record_stage(&mut self, record: StageRecord) {
        for (name, value) in &record.outcome.measurements {
            self.quality_metrics.insert(name, *value);
        }
        if let Some(passed) = record.outcome.qc_passed {
            self.qc_passed = Some(passed);
        }
        self.stage_history.push(record);
    }

    /// Mark the batch terminal at `time`.
    pub fn terminate(&mut self, state: TerminalState, time: Duration) {
        assert!(
            self.terminal_state.is_none(),
            "batch terminal state set twice"
        );
        self.current_stage = None;
        self.terminal_state = Some(state);
        self.terminated_at = Some(time);
    }

    /// Arrival-to-terminal duration, once terminal.
    pub fn cycle_time(&self) -> Option<Duration> {
        self.terminated_at.map(|t| t - self.arrival_time)
    }

    /// Whether the batch has left the line.
    pub fn is_terminal(&self) -> bool {
        self.terminal_state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::STAGE_ORDER;

    fn record(stage: StageKind, start: u64, end: u64, outcome: StageOutcome) -> StageRecord {
        StageRecord {
            stage,
            device: DeviceId(1),
            start_time: Duration::from_secs(start),
            end_time: Duration::from_secs(end),
            outcome,
        }
    }

    #[test]
    fn test_new_batch_starts_at_first_stage() {
        let batch = Batch::new(BatchId(1), Duration::from_secs(10));
        assert_eq!(batch.current_stage, Some(STAGE_ORDER[0]));
        assert!(batch.stage_history.is_empty());
        assert!(!batch.is_terminal());
    }

    #[test]
    fn test_record_stage_folds_measurements() {
        let mut batch = Batch::new(BatchId(1), Duration::ZERO);
        let mut outcome = StageOutcome::new(true);
        outcome.measurements.push(("platelet_yield", 3.2e11));
        batch.record_stage(record(StageKind::Extract, 5, 95, outcome));

        assert_eq!(batch.quality_metrics.get("platelet_yield"), Some(&3.2e11));
        assert_eq!(batch.stage_history.len(), 1);
        assert_eq!(
            batch.stage_history[0].service_time(),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn test_gate_verdict_is_captured() {
        let mut batch = Batch::new(BatchId(2), Duration::ZERO);
        let mut outcome = StageOutcome::new(false);
        outcome.qc_passed = Some(false);
        batch.record_stage(record(StageKind::QualityControl, 100, 340, outcome));
        assert_eq!(batch.qc_passed, Some(false));
    }

    #[test]
    fn test_cycle_time_spans_arrival_to_terminal() {
        let mut batch = Batch::new(BatchId(3), Duration::from_secs(50));
        batch.terminate(TerminalState::Completed, Duration::from_secs(250));
        assert_eq!(batch.cycle_time(), Some(Duration::from_secs(200)));
        assert!(batch.is_terminal());
        assert_eq!(batch.current_stage, None);
    }

    #[test]
    #[should_panic(expected = "terminal state set twice")]
    fn test_double_terminate_panics() {
        let mut batch = Batch::new(BatchId(4), Duration::ZERO);
        batch.terminate(TerminalState::Failed, Duration::from_secs(1));
        batch.terminate(TerminalState::Completed, Duration::from_secs(2));
    }
}
