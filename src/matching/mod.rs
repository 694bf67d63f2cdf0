//! The matching core (C3): a pure algorithm wrapped by an async cycle
//! protocol, driven by a long-lived scheduler loop.

pub mod algorithm;
pub mod cycle;
pub mod scheduler;

pub use algorithm::{run_match, MatchOutcome};
pub use cycle::{run_cycle, CycleReport};
pub use scheduler::{run_scheduler, ShutdownSignal};
