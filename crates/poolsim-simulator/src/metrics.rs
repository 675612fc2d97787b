//! Read-side metrics over recorded simulation state.
//!
//! Nothing here mutates the simulation; a snapshot can be derived at
//! any simulation time and serialized for downstream tooling.

use poolsim_types::{DeviceId, DeviceState, StageKind};
use serde::Serialize;
use std::time::Duration;

/// Running sum of per-visit queue waits for one stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct WaitAccumulator {
    total_wait: Duration,
    samples: u64,
}

impl WaitAccumulator {
    /// Record one visit's wait, sampled at the instant admission was
    /// granted.
    pub(crate) fn record(&mut self, wait: Duration) {
        self.total_wait += wait;
        self.samples += 1;
    }

    pub(crate) fn samples(&self) -> u64 {
        self.samples
    }

    /// Average wait in seconds; zero when nothing was recorded.
    pub(crate) fn average_secs(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_wait.as_secs_f64() / self.samples as f64
        }
    }
}

/// Point-in-time metrics for one device unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceMetrics {
    pub id: DeviceId,
    pub name: String,
    pub stage: StageKind,
    pub state: DeviceState,

    /// Batches waiting for this unit right now.
    pub queue_len: usize,

    pub processed_count: u64,
    pub failure_count: u64,
    pub busy_secs: f64,

    /// Busy time over elapsed time.
    pub utilization: f64,

    /// Batches serviced per second of elapsed time.
    pub throughput: f64,

    /// Failures per second of elapsed time.
    pub failure_rate: f64,
}

/// Queue-wait statistics for one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageWaitMetrics {
    pub stage: StageKind,

    /// Stage visits whose wait has been recorded.
    pub visits: u64,

    pub average_wait_secs: f64,

    /// Batches currently queued across the stage's units.
    pub queue_len: usize,
}

/// Line-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMetrics {
    pub batches_created: u64,
    pub batches_completed: u64,
    pub batches_failed: u64,
    pub batches_in_progress: u64,

    /// Completed over created; zero before the first arrival.
    pub completion_rate: f64,

    /// Mean arrival-to-shipment time over completed batches, seconds.
    pub average_cycle_time_secs: f64,
}

/// The stage with the highest average queue wait. Ties resolve to the
/// earliest stage in routing order; absent until some stage has a
/// recorded visit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BottleneckReport {
    pub stage: StageKind,
    pub average_wait_secs: f64,
    pub queue_len: usize,
}

/// Full metrics snapshot at one simulation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSnapshot {
    pub elapsed_secs: f64,
    pub devices: Vec<DeviceMetrics>,
    pub stages: Vec<StageWaitMetrics>,
    pub pipeline: PipelineMetrics,
    pub bottleneck: Option<BottleneckReport>,
}

impl SimulationSnapshot {
    /// Print a human-readable run summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Pooling Line Summary ===");
        println!("Elapsed (sim time): {:.0}s", self.elapsed_secs);
        println!("Batches created:    {}", self.pipeline.batches_created);
        println!("Batches completed:  {}", self.pipeline.batches_completed);
        println!("Batches failed QC:  {}", self.pipeline.batches_failed);
        println!("In progress:        {}", self.pipeline.batches_in_progress);
        println!(
            "Completion rate:    {:.1}%",
            self.pipeline.completion_rate * 100.0
        );
        println!(
            "Avg cycle time:     {:.0}s",
            self.pipeline.average_cycle_time_secs
        );

        println!("\n=== Devices ===");
        println!(
            "{:<22} {:>12} {:>9} {:>6} {:>9} {:>8}",
            "unit", "state", "processed", "queue", "util", "failures"
        );
        for d in &self.devices {
            println!(
                "{:<22} {:>12} {:>9} {:>6} {:>8.1}% {:>8}",
                d.name,
                d.state.to_string(),
                d.processed_count,
                d.queue_len,
                d.utilization * 100.0,
                d.failure_count
            );
        }

        println!("\n=== Stage Waits ===");
        for s in &self.stages {
            println!(
                "{:<18} visits {:>5}  avg wait {:>8.1}s  queued {:>4}",
                s.stage.to_string(),
                s.visits,
                s.average_wait_secs,
                s.queue_len
            );
        }

        match &self.bottleneck {
            Some(b) => println!(
                "\nBottleneck: {} (avg wait {:.1}s, {} queued)",
                b.stage, b.average_wait_secs, b.queue_len
            ),
            None => println!("\nBottleneck: none (no stage visits recorded)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_accumulator_averages() {
        let mut acc = WaitAccumulator::default();
        assert_eq!(acc.average_secs(), 0.0);

        acc.record(Duration::from_secs(10));
        acc.record(Duration::from_secs(30));
        assert_eq!(acc.samples(), 2);
        assert!((acc.average_secs() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_serializes_to_json() {
        let snapshot = SimulationSnapshot {
            elapsed_secs: 600.0,
            devices: vec![],
            stages: vec![],
            pipeline: PipelineMetrics {
                batches_created: 3,
                batches_completed: 1,
                batches_failed: 1,
                batches_in_progress: 1,
                completion_rate: 1.0 / 3.0,
                average_cycle_time_secs: 250.0,
            },
            bottleneck: Some(BottleneckReport {
                stage: StageKind::Agitate,
                average_wait_secs: 42.0,
                queue_len: 2,
            }),
        };
        let json = serde_json::to_string(&snapshot).expect("snapshot serializes");
        assert!(json.contains("\"batches_created\":3"));
        assert!(json.contains("Agitate"));
    }
}
