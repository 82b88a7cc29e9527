//! # Worker roles and their shared dependencies.
//!
//! This module provides:
//! - [`Worker`] - trait for async cancelable execution units
//! - [`WorkerRef`] - shared reference to a worker (`Arc<dyn Worker>`)
//! - [`Producer`], [`Consumer`] - the two roles that drive the channel
//! - [`Record`] - the item producers generate
//! - [`LatencyRange`] - simulated per-item work
//! - [`WorkerDeps`] - channel, metrics and bus handed to every worker

mod consumer;
mod latency;
mod producer;
mod record;
mod worker;

use std::sync::Arc;

use crate::{
    channel::{BoundedChannel, Message},
    events::Bus,
    metrics::MetricsCollector,
};

pub use consumer::Consumer;
pub use latency::LatencyRange;
pub use producer::Producer;
pub use record::Record;
pub use worker::{Role, Worker, WorkerRef};

/// The channel type shared by producers and consumers.
pub type RecordChannel = BoundedChannel<Message<Record>>;

/// Everything a worker touches besides its own parameters.
#[derive(Clone)]
pub struct WorkerDeps {
    pub channel: Arc<RecordChannel>,
    pub metrics: Arc<dyn MetricsCollector>,
    pub bus: Bus,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::metrics::SystemMetrics;

    pub(crate) fn deps(capacity: usize) -> WorkerDeps {
        WorkerDeps {
            channel: Arc::new(BoundedChannel::new(capacity).unwrap()),
            metrics: Arc::new(SystemMetrics::new()),
            bus: Bus::new(64),
        }
    }
}
