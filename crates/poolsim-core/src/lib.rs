//! Deterministic discrete-event kernel.
//!
//! The kernel is single-threaded and synchronous: time is a virtual
//! clock that jumps from event to event, and a dispatched process runs
//! to its next suspension point before anything else happens. All
//! nondeterminism lives outside this crate; given the same sequence of
//! effects the kernel produces the same schedule, event for event.
//!
//! The kernel is generic over the process token type `P`. It knows
//! nothing about what processes do; it only orders their resumptions
//! in time and arbitrates capacity-limited resources in FIFO order.

mod kernel;
mod pool;
mod scheduler;

pub use kernel::{Effect, Kernel};
pub use pool::{Admission, PoolId, ResourcePool};
pub use scheduler::Scheduler;
