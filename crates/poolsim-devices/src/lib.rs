//! Device unit models for the pooling line.
//!
//! Each physical unit on the line is one [`DeviceModel`]: a service-time
//! profile for its stage kind, cumulative counters, and a failure flag.
//! Outcome synthesis for each stage kind lives in [`outcome`]; the
//! distribution constants match the reference line's equipment.

mod model;
mod outcome;
mod profile;

pub use model::{DeviceCounters, DeviceModel};
pub use outcome::synthesize_outcome;
pub use profile::ServiceProfile;
