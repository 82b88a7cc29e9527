use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio_util::sync::CancellationToken;

use crate::{
    channel::BoundedChannel,
    config::Config,
    error::ConfigError,
    events::Bus,
    metrics::{MetricsCollector, SystemMetrics},
    subscribers::{Subscribe, SubscriberSet},
    workers::WorkerDeps,
};

use super::{
    engine::{Engine, spawn_listener},
    pool::WorkerPool,
    shutdown::{ShutdownCoordinator, ShutdownTimeouts},
};

/// Builder for constructing an [`Engine`] with optional sinks and metrics.
pub struct EngineBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            metrics: None,
        }
    }

    /// Sets event subscribers (log writer, file sink, custom).
    ///
    /// Subscribers receive every event through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the default [`SystemMetrics`] collector.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Builds the engine. Must be called inside a tokio runtime.
    ///
    /// This consumes the builder and initializes:
    /// - the bounded channel (fails with [`ConfigError`] on an invalid capacity)
    /// - event bus and subscriber workers
    /// - worker pool and shutdown coordinator
    pub fn build(self) -> Result<Engine, ConfigError> {
        let cfg = self.cfg;
        cfg.tuning.validate()?;

        let channel = Arc::new(BoundedChannel::new(cfg.queue_capacity())?);
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(SystemMetrics::new()));

        // Subscribe before any worker exists so no event is missed.
        let listener_stop = CancellationToken::new();
        let listener = spawn_listener(
            &bus,
            SubscriberSet::new(self.subscribers),
            listener_stop.clone(),
        );

        let pool = WorkerPool::new(
            WorkerDeps {
                channel,
                metrics,
                bus: bus.clone(),
            },
            &cfg.tuning,
        );
        let coordinator = ShutdownCoordinator::new(
            pool.clone(),
            ShutdownTimeouts {
                producers: cfg.tuning.producer_stop_timeout,
                consumers: cfg.tuning.consumer_drain_timeout,
            },
        );

        Ok(Engine {
            cfg,
            bus,
            pool,
            coordinator,
            started: AtomicBool::new(false),
            listener_stop,
            listener,
        })
    }
}
