//! Process lifecycle: OS signal adapter, tracked background work and the
//! graceful shutdown coordinator.

mod barrier;
mod coordinator;
mod signal;

pub use barrier::{BackgroundWork, WorkGuard};
pub use coordinator::{
    GracefulStop, ShutdownCoordinator, ShutdownOutcome, ShutdownResult, ShutdownState,
};
pub use signal::{OsSignals, ShutdownSignal};
