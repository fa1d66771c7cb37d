//! Refresh cycles and the scheduler publishing their snapshots.

pub mod cycle;
pub mod scheduler;
pub mod snapshot;

pub use cycle::run_cycle;
pub use scheduler::RefreshScheduler;
pub use snapshot::Snapshot;
