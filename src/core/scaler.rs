//! # Auto-scaler: adds emergency consumers under sustained load.
//!
//! ```text
//! every scale_interval (first tick immediate):
//!   load = size / capacity
//!   load > threshold ─► try_start_emergency_consumer(max)
//!                          ├─ Some(id) ─► ScaledUp
//!                          └─ None     ─► at capacity, nothing to do
//! ```
//!
//! The scaler only ever adds consumers. It runs in the pool's monitor group and
//! stops when that group's token fires (phase 1 of shutdown).

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    error::WorkerError,
    events::{Event, EventKind},
    workers::{Role, Worker},
};

use super::pool::WorkerPool;

/// Result of one scaling evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleDecision {
    /// A new emergency consumer was started.
    ScaleUp { id: usize, load: f64 },
    /// Load is at or below the threshold.
    Hold { load: f64 },
    /// Load is high but the emergency cap is reached.
    AtCapacity { load: f64 },
}

/// Periodic load monitor.
pub struct AutoScaler {
    pool: WorkerPool,
    interval: Duration,
    threshold: f64,
    max_emergency: usize,
}

impl AutoScaler {
    pub fn new(pool: WorkerPool, interval: Duration, threshold: f64, max_emergency: usize) -> Self {
        Self {
            pool,
            interval,
            threshold,
            max_emergency,
        }
    }

    /// Samples the channel once and scales up if needed.
    pub fn evaluate(&self) -> ScaleDecision {
        let load = self.pool.deps().channel.load();
        if load <= self.threshold {
            return ScaleDecision::Hold { load };
        }
        match self.pool.try_start_emergency_consumer(self.max_emergency) {
            Some(id) => {
                self.pool.deps().bus.publish(
                    Event::new(EventKind::ScaledUp)
                        .with_component("AUTO-SCALER")
                        .with_message(format!(
                            "High Load detected ({:.0}%). Deploying Emergency Consumer {id}",
                            load * 100.0
                        ))
                        .with_queue_size(self.pool.deps().channel.size()),
                );
                ScaleDecision::ScaleUp { id, load }
            }
            None => ScaleDecision::AtCapacity { load },
        }
    }
}

#[async_trait]
impl Worker for AutoScaler {
    fn name(&self) -> &str {
        "AutoScaler"
    }

    fn role(&self) -> Role {
        Role::Monitor
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
        self.pool.deps().bus.publish(
            Event::new(EventKind::ScalerStarted)
                .with_component("AUTO-SCALER")
                .with_message(format!(
                    "Monitoring every {:?}, threshold {:.0}%, max {} emergency consumers",
                    self.interval,
                    self.threshold * 100.0,
                    self.max_emergency
                )),
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(WorkerError::Canceled),
                _ = ticker.tick() => {
                    self.evaluate();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Message;
    use crate::config::Tuning;
    use crate::workers::{Record, test_support::deps};
    use std::sync::Arc;

    async fn loaded_pool(capacity: usize, fill: usize) -> WorkerPool {
        let pool = WorkerPool::new(deps(capacity), &Tuning::immediate());
        for seq in 1..=fill {
            pool.deps()
                .channel
                .put(Message::Payload(Record::new(1, seq)))
                .await
                .unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn test_holds_at_or_below_threshold() {
        let pool = loaded_pool(4, 3).await;
        let scaler = AutoScaler::new(pool.clone(), Duration::from_secs(1), 0.75, 3);

        assert_eq!(scaler.evaluate(), ScaleDecision::Hold { load: 0.75 });
        assert_eq!(pool.emergency_consumer_count(), 0);
    }

    #[tokio::test]
    async fn test_scales_up_to_cap_then_stops() {
        let pool = loaded_pool(4, 4).await;
        // Spawned consumers do not run until the test yields, so the load stays at 100%.
        let scaler = AutoScaler::new(pool.clone(), Duration::from_secs(1), 0.75, 2);

        assert!(matches!(scaler.evaluate(), ScaleDecision::ScaleUp { id: 1, .. }));
        assert!(matches!(scaler.evaluate(), ScaleDecision::ScaleUp { id: 2, .. }));
        assert!(matches!(scaler.evaluate(), ScaleDecision::AtCapacity { .. }));
        assert_eq!(pool.emergency_consumer_count(), 2);
    }

    #[tokio::test]
    async fn test_scale_up_is_reported_as_warning() {
        let pool = loaded_pool(2, 2).await;
        let mut rx = pool.deps().bus.subscribe();
        let scaler = AutoScaler::new(pool.clone(), Duration::from_secs(1), 0.75, 1);

        assert!(matches!(scaler.evaluate(), ScaleDecision::ScaleUp { id: 1, .. }));

        let ev = loop {
            let ev = rx.try_recv().unwrap();
            if ev.kind == EventKind::ScaledUp {
                break ev;
            }
        };
        assert_eq!(ev.component_or_system(), "AUTO-SCALER");
        assert_eq!(ev.kind.severity(), crate::events::Severity::Warn);
        assert!(ev.message_or_label().contains("Emergency Consumer 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_stops_on_cancel() {
        let pool = loaded_pool(4, 0).await;
        let scaler = Arc::new(AutoScaler::new(pool.clone(), Duration::from_secs(1), 0.75, 3));
        assert!(pool.spawn(scaler));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(pool.monitor_count(), 1);

        let out = pool.stop_producers_and_autoscaler(Duration::from_secs(1)).await;
        assert!(out.is_graceful());
        assert_eq!(pool.monitor_count(), 0);
        assert_eq!(pool.emergency_consumer_count(), 0);
    }
}
