//! # Throughput counters.
//!
//! [`MetricsCollector`] is the only view workers have of metrics. The engine
//! defaults to [`SystemMetrics`] (two relaxed atomics); tests and embedders can
//! plug in any other implementation.
//!
//! ## Rules
//! - Recording is non-blocking and side-effect only.
//! - Totals never decrease.

use std::sync::atomic::{AtomicU64, Ordering};

/// Capability interface for recording and reading cumulative totals.
pub trait MetricsCollector: Send + Sync + 'static {
    /// Records one item successfully inserted into the channel.
    fn record_production(&self);

    /// Records one item taken out of the channel by a consumer.
    fn record_consumption(&self);

    fn total_produced(&self) -> u64;

    fn total_consumed(&self) -> u64;
}

/// Lock-free counters backed by [`AtomicU64`].
#[derive(Debug, Default)]
pub struct SystemMetrics {
    produced: AtomicU64,
    consumed: AtomicU64,
}

impl SystemMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsCollector for SystemMetrics {
    #[inline]
    fn record_production(&self) {
        self.produced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_consumption(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn total_produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    #[inline]
    fn total_consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }
}
