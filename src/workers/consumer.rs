//! # Consumer: drains the channel until it meets the sentinel.
//!
//! ```text
//! loop {
//!   ├─► take()                                   (unbounded, cancellable)
//!   ├─ Shutdown   ─► put(Shutdown) (relay) ─► exit Ok
//!   └─ Payload(r) ─► record_consumption, ItemConsumed
//!                  └─► sleep(consumer_latency)   (cancellable)
//! }
//! ```
//!
//! ## Rules
//! - The relay `put` is **not** raced against cancellation: the slot this consumer
//!   just freed is the one the sentinel goes back into, so the put completes
//!   without waiting once producers are stopped, and the sentinel is never lost.
//! - Cancellation anywhere else returns `Err(Canceled)` with the channel untouched.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    channel::Message,
    error::WorkerError,
    events::{Event, EventKind},
};

use super::{LatencyRange, Role, Worker, WorkerDeps, worker::sleep_or_cancel};

/// Consumer worker; runs until it relays the sentinel or is cancelled.
pub struct Consumer {
    name: String,
    latency: LatencyRange,
    deps: WorkerDeps,
}

impl Consumer {
    pub fn new(name: impl Into<String>, latency: LatencyRange, deps: WorkerDeps) -> Self {
        Self {
            name: name.into(),
            latency,
            deps,
        }
    }
}

#[async_trait]
impl Worker for Consumer {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Consumer
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
        loop {
            let msg = tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(WorkerError::Canceled),
                msg = self.deps.channel.take() => msg,
            };

            match msg {
                Message::Shutdown => {
                    self.deps.channel.put(Message::Shutdown).await?;
                    self.deps.bus.publish(
                        Event::new(EventKind::SentinelReceived)
                            .with_component(self.name.as_str())
                            .with_message("Received POISON PILL. Stopping."),
                    );
                    return Ok(());
                }
                Message::Payload(record) => {
                    self.deps.metrics.record_consumption();
                    let size = self.deps.channel.size();
                    self.deps.bus.publish(
                        Event::new(EventKind::ItemConsumed)
                            .with_component(self.name.as_str())
                            .with_message(format!("PROCESSED {record} | Queue Size: {size}"))
                            .with_queue_size(size),
                    );
                    sleep_or_cancel(self.latency.sample(), &ctx).await?;
                }
            }
        }
    }
}
