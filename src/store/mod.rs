//! Visited-status store contract.
//!
//! A store answers "has this URI been visited" asynchronously. The registry only
//! starts and cancels lookups; positive answers come back over a
//! [`VisitedSignals`] channel that the host drains into
//! `VisitedRegistry::notify_visited`. There is no signal for "not visited".

mod memory;
mod signals;
mod traits;

pub use memory::MemoryVisitedStore;
pub use signals::{visited_signal_channel, VisitedSignaller, VisitedSignals};
pub use traits::{CancelOutcome, LookupHandle, VisitedStore};
