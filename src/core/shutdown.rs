//! # Three-phase shutdown and OS signal handling.
//!
//! [`ShutdownCoordinator`] drives the pool through a fixed state machine:
//!
//! ```text
//! Running
//!   └─► ProducersStopping   stop auto-scaler, wait producers (bounded, then force)
//!         └─► SentinelInserted    put(Shutdown); occupancy can only shrink now
//!               └─► ConsumersDraining   wait consumers (bounded, then force)
//!                     └─► Terminated
//! ```
//!
//! ## Rules
//! - Phases never run out of order and never run twice.
//! - A phase that overruns its bound is logged as a warning, escalates to
//!   force-cancellation and the sequence continues.
//! - Concurrent or repeated [`shutdown`](ShutdownCoordinator::shutdown) calls wait for
//!   the first run and return its cached report.
//!
//! [`wait_for_shutdown_signal`] completes when the process receives a termination signal:
//! `SIGINT`, `SIGTERM` or `SIGQUIT` on Unix, `Ctrl-C` elsewhere.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    channel::Message,
    error::ShutdownError,
    events::{Event, EventKind},
};

use super::pool::{PhaseOutcome, WorkerPool};

/// Position in the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownState {
    Running,
    ProducersStopping,
    SentinelInserted,
    ConsumersDraining,
    Terminated,
}

impl ShutdownState {
    pub fn as_str(self) -> &'static str {
        match self {
            ShutdownState::Running => "running",
            ShutdownState::ProducersStopping => "producers-stopping",
            ShutdownState::SentinelInserted => "sentinel-inserted",
            ShutdownState::ConsumersDraining => "consumers-draining",
            ShutdownState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened during one shutdown run.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub producers: PhaseOutcome,
    pub consumers: PhaseOutcome,
    /// Set when the sentinel could not be deposited in time.
    pub sentinel: Option<ShutdownError>,
    pub elapsed: Duration,
}

impl ShutdownReport {
    /// True when no phase timed out and the sentinel went in.
    pub fn is_clean(&self) -> bool {
        self.producers.is_graceful() && self.consumers.is_graceful() && self.sentinel.is_none()
    }

    /// All errors raised during the run, in phase order.
    pub fn errors(&self) -> Vec<ShutdownError> {
        [
            self.producers.timed_out.clone(),
            self.sentinel.clone(),
            self.consumers.timed_out.clone(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Bounds for each phase.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownTimeouts {
    pub producers: Duration,
    pub consumers: Duration,
}

/// Runs the shutdown sequence against a [`WorkerPool`].
pub struct ShutdownCoordinator {
    pool: WorkerPool,
    timeouts: ShutdownTimeouts,
    state: Mutex<ShutdownState>,
    report: AsyncMutex<Option<ShutdownReport>>,
}

impl ShutdownCoordinator {
    pub fn new(pool: WorkerPool, timeouts: ShutdownTimeouts) -> Self {
        Self {
            pool,
            timeouts,
            state: Mutex::new(ShutdownState::Running),
            report: AsyncMutex::new(None),
        }
    }

    /// Current position in the sequence.
    pub fn state(&self) -> ShutdownState {
        *self.state.lock()
    }

    /// Runs the sequence once; later callers get the same report.
    pub async fn shutdown(&self) -> ShutdownReport {
        let mut cached = self.report.lock().await;
        if let Some(report) = cached.as_ref() {
            return report.clone();
        }

        let report = self.run_phases().await;
        *cached = Some(report.clone());
        report
    }

    async fn run_phases(&self) -> ShutdownReport {
        let started = Instant::now();
        let bus = &self.pool.deps().bus;
        bus.publish(
            Event::new(EventKind::ShutdownRequested)
                .with_component("SYSTEM")
                .with_message("Initiating graceful shutdown..."),
        );

        self.enter(ShutdownState::ProducersStopping, "Stopping producers...");
        let producers = self
            .pool
            .stop_producers_and_autoscaler(self.timeouts.producers)
            .await;
        self.finish_phase(&producers);

        let channel = &self.pool.deps().channel;
        let sentinel = match tokio::time::timeout(
            self.timeouts.consumers,
            channel.put(Message::Shutdown),
        )
        .await
        {
            Ok(res) => {
                debug_assert!(res.is_ok(), "sentinel rejected: {res:?}");
                None
            }
            Err(_) => Some(ShutdownError::SentinelTimeout {
                timeout: self.timeouts.consumers,
            }),
        };
        self.enter(ShutdownState::SentinelInserted, "Inserted poison pill for consumers.");
        match &sentinel {
            None => bus.publish(
                Event::new(EventKind::SentinelInserted)
                    .with_component("SYSTEM")
                    .with_message("Queue can only shrink now; consumers will drain and stop.")
                    .with_queue_size(channel.size()),
            ),
            Some(err) => bus.publish(
                Event::new(EventKind::PhaseTimedOut)
                    .with_component("SYSTEM")
                    .with_message(err.to_string())
                    .with_timeout(self.timeouts.consumers),
            ),
        }

        self.enter(
            ShutdownState::ConsumersDraining,
            "Waiting for consumers to finish draining queue...",
        );
        let consumers = self.pool.wait_for_consumers(self.timeouts.consumers).await;
        self.finish_phase(&consumers);

        self.enter(ShutdownState::Terminated, "All workers stopped.");
        let report = ShutdownReport {
            producers,
            consumers,
            sentinel,
            elapsed: started.elapsed(),
        };
        bus.publish(
            Event::new(EventKind::ShutdownCompleted)
                .with_component("SYSTEM")
                .with_message(if report.is_clean() {
                    "Shutdown complete - all workers stopped gracefully."
                } else {
                    "Shutdown complete - some workers had to be force-stopped."
                }),
        );
        report
    }

    fn enter(&self, next: ShutdownState, message: &str) {
        *self.state.lock() = next;
        self.pool.deps().bus.publish(
            Event::new(EventKind::PhaseStarted)
                .with_component("SYSTEM")
                .with_message(format!("[{next}] {message}")),
        );
    }

    fn finish_phase(&self, outcome: &PhaseOutcome) {
        if outcome.is_graceful() {
            self.pool.deps().bus.publish(
                Event::new(EventKind::PhaseCompleted)
                    .with_component("SYSTEM")
                    .with_message(format!("All {} stopped in time.", outcome.phase)),
            );
        } else if !outcome.aborted.is_empty() {
            self.pool.deps().bus.log(
                "SYSTEM",
                format!(
                    "Some {} did not terminate gracefully: {:?}",
                    outcome.phase, outcome.aborted
                ),
            );
        }
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` on Ctrl-C, or `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::workers::test_support::deps;
    use std::sync::Arc;

    fn coordinator(capacity: usize) -> (WorkerPool, ShutdownCoordinator) {
        let pool = WorkerPool::new(deps(capacity), &Tuning::immediate());
        let coord = ShutdownCoordinator::new(
            pool.clone(),
            ShutdownTimeouts {
                producers: Duration::from_secs(5),
                consumers: Duration::from_secs(5),
            },
        );
        (pool, coord)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_clean_shutdown_leaves_only_the_sentinel() {
        let (pool, coord) = coordinator(4);
        pool.start_consumers(2);
        pool.start_producers(3, 10);
        assert_eq!(coord.state(), ShutdownState::Running);

        let report = coord.shutdown().await;

        assert!(report.is_clean(), "{report:?}");
        assert_eq!(coord.state(), ShutdownState::Terminated);
        assert_eq!(pool.producer_count(), 0);
        assert_eq!(pool.consumer_count(), 0);
        assert_eq!(pool.deps().channel.size(), 1);
        assert_eq!(pool.deps().metrics.total_consumed(), 30);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_share_one_run() {
        let (pool, coord) = coordinator(4);
        pool.start_consumers(1);
        let coord = Arc::new(coord);

        let a = tokio::spawn({
            let c = coord.clone();
            async move { c.shutdown().await }
        });
        let b = tokio::spawn({
            let c = coord.clone();
            async move { c.shutdown().await }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!(a.elapsed, b.elapsed);
        assert_eq!(pool.deps().channel.size(), 1);
        // A third call after the fact is also served from the cache.
        assert_eq!(coord.shutdown().await.elapsed, a.elapsed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_graceful_phases_publish_completion() {
        let (pool, coord) = coordinator(4);
        let mut rx = pool.deps().bus.subscribe();
        pool.start_consumers(1);

        let report = coord.shutdown().await;
        assert!(report.is_clean(), "{report:?}");

        let mut completed = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::PhaseCompleted {
                completed.push(ev.message_or_label().to_string());
            }
        }
        assert_eq!(
            completed,
            vec!["All producers stopped in time.", "All consumers stopped in time."]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_channel_without_consumers_times_out_sentinel() {
        let (pool, coord) = coordinator(1);
        pool.deps()
            .channel
            .put(Message::Payload(crate::workers::Record::new(1, 1)))
            .await
            .unwrap();

        let report = coord.shutdown().await;

        assert!(!report.is_clean());
        assert!(matches!(
            report.sentinel,
            Some(ShutdownError::SentinelTimeout { .. })
        ));
        assert_eq!(coord.state(), ShutdownState::Terminated);
        assert_eq!(report.errors().len(), 1);
    }
}
