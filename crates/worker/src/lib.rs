//! Worker primitives shared by the ghost-cell stream crates.
//!
//! * [`spawn`]: task spawning tagged with a [`TaskClass`] for observability
//! * [`FifoQueue`]: unbounded FIFO with a suspending pop and idempotent close

#![warn(missing_docs)]

mod class;
mod queue;
mod spawn;

pub use class::TaskClass;
pub use queue::{FifoQueue, QueueClosed};
pub use spawn::spawn;
