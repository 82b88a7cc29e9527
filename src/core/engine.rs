//! # Engine: one end-to-end run of the pipeline.
//!
//! ```text
//! EngineBuilder::build()
//!   ├─► BoundedChannel(capacity), metrics, Bus
//!   ├─► WorkerPool, ShutdownCoordinator
//!   └─► listener: Bus ─► SubscriberSet::emit   (until close())
//!
//! run(token):
//!   start()               consumers ─► producers ─► AutoScaler
//!   wait_for_completion   consumed == expected
//!                         | producers done && consumed == produced
//!                         | token cancelled ─► interrupt() (cancel producers)
//!   shutdown()            three phases, see [`ShutdownCoordinator`]
//!   ─► RunSummary
//!
//! close()                 drain the bus, stop subscribers (file sink flushed and closed)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    events::Bus,
    status::StatusProbe,
    subscribers::SubscriberSet,
};

use super::{
    pool::WorkerPool,
    scaler::AutoScaler,
    shutdown::{ShutdownCoordinator, ShutdownReport, ShutdownState},
};

/// Why [`Engine::wait_for_completion`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every expected item was consumed.
    AllConsumed,
    /// Producers are done and everything they managed to add was consumed.
    ProducersDone,
    /// The caller's token fired first.
    Cancelled,
}

/// Final figures of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub config: Config,
    pub completion: Completion,
    pub expected: u64,
    pub produced: u64,
    pub consumed: u64,
    pub final_size: usize,
    pub emergency_consumers: usize,
    pub producers_alive: usize,
    pub consumers_alive: usize,
    pub shutdown: ShutdownReport,
}

impl RunSummary {
    /// Every expected item was consumed.
    pub fn is_success(&self) -> bool {
        self.consumed == self.expected
    }

    /// No worker survived shutdown and none had to be force-stopped.
    pub fn is_clean_shutdown(&self) -> bool {
        self.producers_alive == 0 && self.consumers_alive == 0 && self.shutdown.is_clean()
    }

    /// Percentage of `n` against the expected total.
    pub fn rate(&self, n: u64) -> f64 {
        if self.expected == 0 {
            return 0.0;
        }
        n as f64 * 100.0 / self.expected as f64
    }
}

/// A wired pipeline ready to run once.
pub struct Engine {
    pub(super) cfg: Config,
    pub(super) bus: Bus,
    pub(super) pool: WorkerPool,
    pub(super) coordinator: ShutdownCoordinator,
    pub(super) started: AtomicBool,
    pub(super) listener_stop: CancellationToken,
    pub(super) listener: JoinHandle<()>,
}

impl Engine {
    /// Configuration this engine was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Pool handle (counts, channel, metrics).
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Probe for dashboards and status checks.
    pub fn probe(&self) -> StatusProbe {
        StatusProbe::new(self.pool.clone())
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.coordinator.state()
    }

    /// Starts consumers, then producers, then the auto-scaler. Later calls are no-ops.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let cfg = &self.cfg;
        self.bus
            .log("SYSTEM", format!("Initializing simulation with {cfg}"));

        self.pool.start_consumers(cfg.consumers());
        self.pool
            .start_producers(cfg.producers(), cfg.items_per_producer());
        self.pool.spawn(Arc::new(AutoScaler::new(
            self.pool.clone(),
            cfg.tuning.scale_interval,
            cfg.tuning.scale_threshold,
            cfg.tuning.max_emergency_consumers,
        )));
    }

    /// Polls metrics until the run is complete or `token` fires.
    pub async fn wait_for_completion(&self, token: &CancellationToken) -> Completion {
        let expected = self.cfg.total_expected_items();
        let metrics = &self.pool.deps().metrics;
        self.bus.log(
            "SYSTEM",
            format!("Waiting for {expected} items to be processed..."),
        );

        let mut ticker = tokio::time::interval(self.cfg.tuning.completion_poll);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    self.bus.log("SYSTEM", "Run interrupted; shutting down early.");
                    return Completion::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            let consumed = metrics.total_consumed();
            if consumed >= expected {
                self.bus
                    .log("SYSTEM", format!("All {expected} items processed."));
                return Completion::AllConsumed;
            }
            if self.pool.producer_count() == 0 && consumed >= metrics.total_produced() {
                self.bus.log(
                    "SYSTEM",
                    format!(
                        "Producers finished; {consumed} of {expected} items processed (rest timed out)."
                    ),
                );
                return Completion::ProducersDone;
            }
        }
    }

    /// Stops producers early; call before [`shutdown`](Self::shutdown) on an interrupted run.
    pub fn interrupt(&self) {
        self.bus
            .log("SYSTEM", "Interrupt received; cancelling producers.");
        self.pool.cancel_producers();
    }

    /// Runs the shutdown sequence (once; later calls return the same report).
    pub async fn shutdown(&self) -> ShutdownReport {
        self.coordinator.shutdown().await
    }

    /// `start` ─► `wait_for_completion` ─► `shutdown`.
    pub async fn run(&self, token: &CancellationToken) -> RunSummary {
        self.start();
        let completion = self.wait_for_completion(token).await;
        if completion == Completion::Cancelled {
            self.interrupt();
        }
        let report = self.shutdown().await;
        self.summarize(completion, report)
    }

    /// Collects the figures for a finished run.
    pub fn summarize(&self, completion: Completion, shutdown: ShutdownReport) -> RunSummary {
        let deps = self.pool.deps();
        RunSummary {
            config: self.cfg.clone(),
            completion,
            expected: self.cfg.total_expected_items(),
            produced: deps.metrics.total_produced(),
            consumed: deps.metrics.total_consumed(),
            final_size: deps.channel.size(),
            emergency_consumers: self.pool.emergency_consumer_count(),
            producers_alive: self.pool.producer_count(),
            consumers_alive: self.pool.consumer_count(),
            shutdown,
        }
    }

    /// Delivers every event still on the bus, then stops all subscribers.
    pub async fn close(self) {
        self.listener_stop.cancel();
        if let Err(err) = self.listener.await {
            tracing::warn!(error = %err, "event listener ended abnormally");
        }
    }
}

/// Forwards bus events into the subscriber set until `stop` fires.
pub(super) fn spawn_listener(
    bus: &Bus,
    set: SubscriberSet,
    stop: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged; events lost");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => set.emit(ev),
                            Err(TryRecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "event listener lagged; events lost");
                            }
                            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                        }
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    })
}
