//! Configuration for a simulation run.

use poolsim_types::{StageKind, STAGE_COUNT, STAGE_ORDER};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors, raised once at construction before any event
/// is scheduled.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("simulation horizon must be positive")]
    ZeroHorizon,

    #[error("mean inter-arrival time must be positive")]
    ZeroInterArrival,

    #[error("stage {0} has no units configured")]
    NoUnits(StageKind),

    #[error("mean time between failures must be positive")]
    ZeroMtbf,

    #[error("mean time to repair must be positive")]
    ZeroMttr,
}

/// Failure-injection parameters for the whole fleet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FailureConfig {
    /// Mean time between failures per unit. Failure waits are drawn
    /// from an exponential with this mean.
    pub mtbf: Duration,

    /// Mean time to repair. Repair waits are drawn from an exponential
    /// with this mean.
    pub mttr: Duration,

    /// When `true`, a repair occupies one slot of the unit's pool for
    /// its duration, waiting FIFO behind in-flight work, so batch
    /// admission stalls while the unit is down. When `false`, repair is
    /// observational only and does not gate admission.
    pub repair_blocks_acquire: bool,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            mtbf: Duration::from_secs(4 * 3600),
            mttr: Duration::from_secs(30 * 60),
            repair_blocks_acquire: false,
        }
    }
}

impl FailureConfig {
    pub fn with_mtbf(mut self, mtbf: Duration) -> Self {
        self.mtbf = mtbf;
        self
    }

    pub fn with_mttr(mut self, mttr: Duration) -> Self {
        self.mttr = mttr;
        self
    }

    /// Make repairs occupy a unit slot instead of being observational.
    pub fn with_blocking_repair(mut self) -> Self {
        self.repair_blocks_acquire = true;
        self
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationConfig {
    /// Virtual-time horizon at which the run stops.
    pub horizon: Duration,

    /// Mean of the exponential inter-arrival distribution.
    pub mean_inter_arrival: Duration,

    /// Seed for the single simulation RNG. Identical seeds replay
    /// identical runs, event for event.
    pub seed: u64,

    /// Number of physical units per stage, in routing order.
    pub stage_units: [usize; STAGE_COUNT],

    /// Failure injection; `None` disables the failure cycle entirely.
    pub failures: Option<FailureConfig>,
}

impl SimulationConfig {
    /// An eight-hour shift with the reference line's unit counts and
    /// no failure injection.
    pub fn new() -> Self {
        let mut stage_units = [1; STAGE_COUNT];
        stage_units[StageKind::Separate.index()] = 2;
        Self {
            horizon: Duration::from_secs(8 * 3600),
            mean_inter_arrival: Duration::from_secs(300),
            seed: 12345,
            stage_units,
            failures: None,
        }
    }

    pub fn with_horizon(mut self, horizon: Duration) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_mean_inter_arrival(mut self, mean: Duration) -> Self {
        self.mean_inter_arrival = mean;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the unit count for one stage.
    pub fn with_stage_units(mut self, stage: StageKind, units: usize) -> Self {
        self.stage_units[stage.index()] = units;
        self
    }

    /// Set the same unit count for every stage.
    pub fn with_uniform_units(mut self, units: usize) -> Self {
        self.stage_units = [units; STAGE_COUNT];
        self
    }

    pub fn with_failures(mut self, failures: FailureConfig) -> Self {
        self.failures = Some(failures);
        self
    }

    /// Total physical units across the line.
    pub fn total_units(&self) -> usize {
        self.stage_units.iter().sum()
    }

    /// Validate before any event is scheduled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon.is_zero() {
            return Err(ConfigError::ZeroHorizon);
        }
        if self.mean_inter_arrival.is_zero() {
            return Err(ConfigError::ZeroInterArrival);
        }
        for (i, &units) in self.stage_units.iter().enumerate() {
            if units == 0 {
                return Err(ConfigError::NoUnits(STAGE_ORDER[i]));
            }
        }
        if let Some(failures) = &self.failures {
            if failures.mtbf.is_zero() {
                return Err(ConfigError::ZeroMtbf);
            }
            if failures.mttr.is_zero() {
                return Err(ConfigError::ZeroMttr);
            }
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stage_units[StageKind::Separate.index()], 2);
        assert_eq!(config.stage_units[StageKind::Scan.index()], 1);
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let config = SimulationConfig::new().with_horizon(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroHorizon));
    }

    #[test]
    fn test_zero_unit_stage_rejected() {
        let config = SimulationConfig::new().with_stage_units(StageKind::Pool, 0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::NoUnits(StageKind::Pool))
        );
    }

    #[test]
    fn test_failure_params_validated() {
        let config = SimulationConfig::new()
            .with_failures(FailureConfig::default().with_mtbf(Duration::ZERO));
        assert_eq!(config.validate(), Err(ConfigError::ZeroMtbf));
    }
}
