//! The simulation context and its pipeline state machines.

use crate::config::{ConfigError, SimulationConfig};
use crate::metrics::{
    BottleneckReport, DeviceMetrics, PipelineMetrics, SimulationSnapshot, StageWaitMetrics,
    WaitAccumulator,
};
use crate::process::{FailurePhase, JourneyPhase, Process};
use poolsim_core::{Effect, Kernel};
use poolsim_devices::{synthesize_outcome, DeviceModel};
use poolsim_types::{
    Batch, BatchId, DeviceId, StageKind, StageRecord, TerminalState, STAGE_COUNT, STAGE_ORDER,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One simulation run: kernel, device fleet, batch store, RNG, and
/// accumulated statistics. All state is owned here; independent
/// simulations never interfere.
pub struct Simulation {
    config: SimulationConfig,
    kernel: Kernel<Process>,
    devices: Vec<DeviceModel>,

    /// Device indices per stage, in routing order.
    stage_units: [Vec<usize>; STAGE_COUNT],

    /// The single RNG. Every stochastic draw flows through it in
    /// dispatch order, which is what makes seeded replays exact.
    rng: ChaCha8Rng,

    active: BTreeMap<BatchId, Batch>,
    completed: Vec<Batch>,
    failed: Vec<Batch>,

    next_batch_id: u64,
    batches_created: u64,

    wait_stats: [WaitAccumulator; STAGE_COUNT],
}

impl Simulation {
    /// Build the fleet and schedule the initial processes.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut kernel = Kernel::new();
        let mut devices = Vec::with_capacity(config.total_units());
        let mut stage_units: [Vec<usize>; STAGE_COUNT] = Default::default();

        for (stage_index, &unit_count) in config.stage_units.iter().enumerate() {
            let kind = STAGE_ORDER[stage_index];
            for unit_index in 0..unit_count {
                let slots = poolsim_devices::ServiceProfile::for_stage(kind).slots;
                let pool = kernel.create_pool(slots);
                let device_index = devices.len();
                devices.push(DeviceModel::new(
                    DeviceId(device_index as u32),
                    unit_index,
                    kind,
                    pool,
                ));
                stage_units[stage_index].push(device_index);
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        // First arrival after one inter-arrival draw, then the tick
        // reschedules itself forever.
        let first_arrival = exp_duration(&mut rng, config.mean_inter_arrival);
        kernel.schedule(first_arrival, Process::ArrivalTick);

        if let Some(failures) = &config.failures {
            for device_index in 0..devices.len() {
                let first_failure = exp_duration(&mut rng, failures.mtbf);
                kernel.schedule(
                    first_failure,
                    Process::FailureCycle {
                        device: device_index,
                        phase: FailurePhase::Fail,
                    },
                );
            }
        }

        info!(
            units = devices.len(),
            horizon_secs = config.horizon.as_secs(),
            seed = config.seed,
            failures = config.failures.is_some(),
            "Simulation created"
        );

        Ok(Self {
            config,
            kernel,
            devices,
            stage_units,
            rng,
            active: BTreeMap::new(),
            completed: Vec::new(),
            failed: Vec::new(),
            next_batch_id: 1,
            batches_created: 0,
            wait_stats: Default::default(),
        })
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.kernel.now()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Dispatch a single event, if one is pending. Returns `false`
    /// once the queue is empty.
    pub fn step(&mut self) -> bool {
        match self.kernel.next_event() {
            Some(process) => {
                let effects = self.run_process(process);
                for effect in effects {
                    self.kernel.apply(effect);
                }
                true
            }
            None => false,
        }
    }

    /// Run until the next event lies at or beyond `until`, then pin
    /// the clock there. An event scheduled exactly at `until` is not
    /// dispatched.
    pub fn run_until(&mut self, until: Duration) {
        while let Some(t) = self.kernel.peek_time() {
            if t >= until {
                break;
            }
            self.step();
        }
        self.kernel.advance_to(until);
    }

    /// Run to the configured horizon.
    pub fn run_to_horizon(&mut self) {
        let horizon = self.config.horizon;
        self.run_until(horizon);
        info!(
            now_secs = self.now().as_secs(),
            created = self.batches_created,
            completed = self.completed.len(),
            failed = self.failed.len(),
            "Simulation horizon reached"
        );
    }

    /// Run one step of the dispatched state machine.
    fn run_process(&mut self, process: Process) -> Vec<Effect<Process>> {
        match process {
            Process::ArrivalTick => self.on_arrival(),
            Process::Journey {
                batch,
                stage,
                phase,
            } => match phase {
                JourneyPhase::Enter => self.on_journey_enter(batch, stage),
                JourneyPhase::Service { unit, queued_at } => {
                    self.on_journey_service(batch, stage, unit, queued_at)
                }
                JourneyPhase::Finish { unit, started_at } => {
                    self.on_journey_finish(batch, stage, unit, started_at)
                }
            },
            Process::FailureCycle { device, phase } => self.on_failure_cycle(device, phase),
        }
    }

    /// One batch arrives; fork its journey and reschedule the tick.
    fn on_arrival(&mut self) -> Vec<Effect<Process>> {
        let id = BatchId(self.next_batch_id);
        self.next_batch_id += 1;
        self.batches_created += 1;

        let batch = Batch::new(id, self.now());
        info!(batch = %id, at_secs = self.now().as_secs_f64(), "Batch arrived");
        self.active.insert(id, batch);

        let next_arrival = exp_duration(&mut self.rng, self.config.mean_inter_arrival);
        vec![
            Effect::Schedule {
                delay: Duration::ZERO,
                process: Process::Journey {
                    batch: id,
                    stage: STAGE_ORDER[0],
                    phase: JourneyPhase::Enter,
                },
            },
            Effect::Schedule {
                delay: next_arrival,
                process: Process::ArrivalTick,
            },
        ]
    }

    /// Select a unit for this stage visit and request admission.
    /// Selection happens before the acquire, so the batch queues at
    /// one physical unit.
    fn on_journey_enter(&mut self, batch: BatchId, stage: StageKind) -> Vec<Effect<Process>> {
        let units = &self.stage_units[stage.index()];
        let unit = units[self.rng.gen_range(0..units.len())];
        let queued_at = self.now();

        debug!(batch = %batch, stage = %stage, unit = %self.devices[unit].name, "Queueing");
        vec![Effect::Acquire {
            pool: self.devices[unit].pool,
            process: Process::Journey {
                batch,
                stage,
                phase: JourneyPhase::Service { unit, queued_at },
            },
        }]
    }

    /// Admission granted: record the wait, start service.
    fn on_journey_service(
        &mut self,
        batch: BatchId,
        stage: StageKind,
        unit: usize,
        queued_at: Duration,
    ) -> Vec<Effect<Process>> {
        let wait = self.now() - queued_at;
        self.wait_stats[stage.index()].record(wait);

        self.devices[unit].begin_service();
        let service_time = self.devices[unit].profile.sample(&mut self.rng);

        debug!(
            batch = %batch,
            stage = %stage,
            unit = %self.devices[unit].name,
            wait_secs = wait.as_secs_f64(),
            service_secs = service_time.as_secs_f64(),
            "Service started"
        );
        vec![Effect::Schedule {
            delay: service_time,
            process: Process::Journey {
                batch,
                stage,
                phase: JourneyPhase::Finish {
                    unit,
                    started_at: self.now(),
                },
            },
        }]
    }

    /// Service done: synthesize the outcome, release the unit, route.
    fn on_journey_finish(
        &mut self,
        batch_id: BatchId,
        stage: StageKind,
        unit: usize,
        started_at: Duration,
    ) -> Vec<Effect<Process>> {
        let now = self.now();
        let outcome = synthesize_outcome(stage, &mut self.rng);
        let qc_rejected = stage.is_quality_gate() && outcome.qc_passed == Some(false);

        let device = &mut self.devices[unit];
        device.finish_service(now - started_at);
        let record = StageRecord {
            stage,
            device: device.id,
            start_time: started_at,
            end_time: now,
            outcome,
        };

        let batch = self
            .active
            .get_mut(&batch_id)
            .expect("journey batch is active");
        batch.record_stage(record);

        // Release first: a waiting batch's admission lands ahead of
        // this batch's own continuation at the same instant.
        let mut effects = vec![Effect::Release {
            pool: self.devices[unit].pool,
        }];

        if qc_rejected {
            let mut batch = self.active.remove(&batch_id).expect("batch present");
            batch.terminate(TerminalState::Failed, now);
            warn!(batch = %batch_id, at_secs = now.as_secs_f64(), "Batch rejected at quality control");
            self.failed.push(batch);
        } else if let Some(next) = stage.next() {
            batch.current_stage = Some(next);
            effects.push(Effect::Schedule {
                delay: Duration::ZERO,
                process: Process::Journey {
                    batch: batch_id,
                    stage: next,
                    phase: JourneyPhase::Enter,
                },
            });
        } else {
            let mut batch = self.active.remove(&batch_id).expect("batch present");
            batch.terminate(TerminalState::Completed, now);
            info!(
                batch = %batch_id,
                cycle_secs = batch.cycle_time().map(|d| d.as_secs_f64()).unwrap_or(0.0),
                "Batch shipped"
            );
            self.completed.push(batch);
        }
        effects
    }

    /// One step of a unit's failure/repair loop.
    fn on_failure_cycle(&mut self, device: usize, phase: FailurePhase) -> Vec<Effect<Process>> {
        let failures = self
            .config
            .failures
            .expect("failure cycle only runs with failures configured");
        match phase {
            FailurePhase::Fail => {
                if failures.repair_blocks_acquire {
                    // The repair takes a slot like any other admission,
                    // so an in-service batch finishes first.
                    vec![Effect::Acquire {
                        pool: self.devices[device].pool,
                        process: Process::FailureCycle {
                            device,
                            phase: FailurePhase::BeginRepair,
                        },
                    }]
                } else {
                    self.begin_repair(device, failures.mttr)
                }
            }
            FailurePhase::BeginRepair => self.begin_repair(device, failures.mttr),
            FailurePhase::Restore => {
                self.devices[device].mark_repaired();
                info!(unit = %self.devices[device].name, "Unit repaired");

                let mut effects = Vec::new();
                if failures.repair_blocks_acquire {
                    effects.push(Effect::Release {
                        pool: self.devices[device].pool,
                    });
                }
                let next_failure = exp_duration(&mut self.rng, failures.mtbf);
                effects.push(Effect::Schedule {
                    delay: next_failure,
                    process: Process::FailureCycle {
                        device,
                        phase: FailurePhase::Fail,
                    },
                });
                effects
            }
        }
    }

    fn begin_repair(&mut self, device: usize, mttr: Duration) -> Vec<Effect<Process>> {
        self.devices[device].mark_failed();
        warn!(unit = %self.devices[device].name, at_secs = self.now().as_secs_f64(), "Unit failed");

        let repair_time = exp_duration(&mut self.rng, mttr);
        vec![Effect::Schedule {
            delay: repair_time,
            process: Process::FailureCycle {
                device,
                phase: FailurePhase::Restore,
            },
        }]
    }

    // Read-side accessors.

    pub fn devices(&self) -> &[DeviceModel] {
        &self.devices
    }

    pub fn batches_created(&self) -> u64 {
        self.batches_created
    }

    /// Batches still somewhere on the line, in id order.
    pub fn active_batches(&self) -> impl Iterator<Item = &Batch> {
        self.active.values()
    }

    /// Batches that shipped, in completion order.
    pub fn completed_batches(&self) -> &[Batch] {
        &self.completed
    }

    /// Batches rejected at the gate, in rejection order.
    pub fn failed_batches(&self) -> &[Batch] {
        &self.failed
    }

    /// Live queue length at one unit's pool.
    pub fn unit_queue_len(&self, device_index: usize) -> usize {
        self.kernel.pool(self.devices[device_index].pool).queue_len()
    }

    /// Derive the metrics snapshot at the current simulation time.
    pub fn snapshot(&self) -> SimulationSnapshot {
        let elapsed = self.now();

        let devices: Vec<DeviceMetrics> = self
            .devices
            .iter()
            .enumerate()
            .map(|(i, d)| DeviceMetrics {
                id: d.id,
                name: d.name.clone(),
                stage: d.kind,
                state: d.state(),
                queue_len: self.unit_queue_len(i),
                processed_count: d.counters.processed_count,
                failure_count: d.counters.failure_count,
                busy_secs: d.counters.busy_time.as_secs_f64(),
                utilization: d.utilization(elapsed),
                throughput: d.throughput(elapsed),
                failure_rate: d.failure_rate(elapsed),
            })
            .collect();

        let stages: Vec<StageWaitMetrics> = STAGE_ORDER
            .iter()
            .enumerate()
            .map(|(i, &stage)| StageWaitMetrics {
                stage,
                visits: self.wait_stats[i].samples(),
                average_wait_secs: self.wait_stats[i].average_secs(),
                queue_len: self.stage_units[i]
                    .iter()
                    .map(|&d| self.unit_queue_len(d))
                    .sum(),
            })
            .collect();

        // Max average wait; earlier stage wins ties. Stages never
        // visited carry no wait evidence.
        let bottleneck = stages
            .iter()
            .filter(|s| s.visits > 0)
            .fold(None::<&StageWaitMetrics>, |best, s| match best {
                Some(b) if s.average_wait_secs > b.average_wait_secs => Some(s),
                None => Some(s),
                _ => best,
            })
            .map(|s| BottleneckReport {
                stage: s.stage,
                average_wait_secs: s.average_wait_secs,
                queue_len: s.queue_len,
            });

        let completed = self.completed.len() as u64;
        let failed = self.failed.len() as u64;
        let average_cycle_time_secs = if self.completed.is_empty() {
            0.0
        } else {
            self.completed
                .iter()
                .filter_map(|b| b.cycle_time())
                .map(|d| d.as_secs_f64())
                .sum::<f64>()
                / self.completed.len() as f64
        };

        SimulationSnapshot {
            elapsed_secs: elapsed.as_secs_f64(),
            devices,
            stages,
            pipeline: PipelineMetrics {
                batches_created: self.batches_created,
                batches_completed: completed,
                batches_failed: failed,
                batches_in_progress: self.active.len() as u64,
                completion_rate: if self.batches_created == 0 {
                    0.0
                } else {
                    completed as f64 / self.batches_created as f64
                },
                average_cycle_time_secs,
            },
            bottleneck,
        }
    }
}

/// Exponential draw with the given mean.
fn exp_duration(rng: &mut ChaCha8Rng, mean: Duration) -> Duration {
    let rate = 1.0 / mean.as_secs_f64();
    let exp = Exp::new(rate).expect("exponential rate is positive and finite");
    Duration::from_secs_f64(exp.sample(rng))
}
