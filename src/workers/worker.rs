//! # Worker abstraction.
//!
//! A [`Worker`] has a stable [`name`](Worker::name), a [`Role`] and an async
//! [`run`](Worker::run) method that receives a [`CancellationToken`]. The pool owns
//! the token; workers check it at every suspension point and return
//! [`WorkerError::Canceled`] when it fires.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;

/// Which group of the pool a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Producer,
    Consumer,
    /// Periodic control loops (the auto-scaler).
    Monitor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
            Role::Monitor => "monitor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Asynchronous, cancelable execution unit.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use queuevisor::{Role, Worker, WorkerError};
///
/// struct Idle;
///
/// #[async_trait]
/// impl Worker for Idle {
///     fn name(&self) -> &str { "idle" }
///     fn role(&self) -> Role { Role::Monitor }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
///         ctx.cancelled().await;
///         Err(WorkerError::Canceled)
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Returns a stable, human-readable worker name.
    fn name(&self) -> &str;

    fn role(&self) -> Role;

    /// Runs until the work is done (`Ok`) or `ctx` is cancelled (`Err(Canceled)`).
    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError>;
}

/// Sleeps for `d` unless `ctx` fires first.
pub(crate) async fn sleep_or_cancel(d: Duration, ctx: &CancellationToken) -> Result<(), WorkerError> {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(WorkerError::Canceled),
        _ = tokio::time::sleep(d) => Ok(()),
    }
}
