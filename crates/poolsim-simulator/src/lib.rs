//! Pooling-line simulation.
//!
//! Ties the kernel, the device fleet, and the pipeline processes into a
//! single [`Simulation`] context. Multiple simulations can run side by
//! side in one process; nothing here is global.

mod config;
mod metrics;
mod process;
mod runner;

pub use config::{ConfigError, FailureConfig, SimulationConfig};
pub use metrics::{
    BottleneckReport, DeviceMetrics, PipelineMetrics, SimulationSnapshot, StageWaitMetrics,
};
pub use process::{FailurePhase, JourneyPhase, Process};
pub use runner::Simulation;
