//! Runtime core: pool, scaling, shutdown and the engine that wires them.
//!
//! - [`WorkerPool`]: per-role groups of spawned workers with live counts;
//! - [`AutoScaler`]: adds emergency consumers under sustained load;
//! - [`ShutdownCoordinator`]: the three-phase stop sequence (+ OS signal helper);
//! - [`Engine`] / [`EngineBuilder`]: one end-to-end run.

mod builder;
mod engine;
mod pool;
mod scaler;
mod shutdown;

pub use builder::EngineBuilder;
pub use engine::{Completion, Engine, RunSummary};
pub use pool::{PhaseOutcome, WorkerPool};
pub use scaler::{AutoScaler, ScaleDecision};
pub use shutdown::{
    ShutdownCoordinator, ShutdownReport, ShutdownState, ShutdownTimeouts, wait_for_shutdown_signal,
};
