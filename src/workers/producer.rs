//! # Producer: generates records and offers them with a bounded wait.
//!
//! ```text
//! for seq in 1..=items {
//!   ├─► sleep(producer_latency)                (cancellable)
//!   ├─► offer(Record-id-seq, offer_timeout)    (cancellable)
//!   │     ├─ true  ─► record_production, ItemProduced
//!   │     └─ false ─► OfferTimedOut, item dropped (no retry)
//! }
//! ```
//!
//! The offer is never unbounded: under sustained backpressure a producer sheds
//! items instead of pinning itself to a full channel.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    channel::Message,
    error::WorkerError,
    events::{Event, EventKind},
};

use super::{LatencyRange, Record, Role, Worker, WorkerDeps, worker::sleep_or_cancel};

/// Producer worker emitting `items` records.
pub struct Producer {
    name: String,
    id: usize,
    items: usize,
    latency: LatencyRange,
    offer_timeout: Duration,
    deps: WorkerDeps,
}

impl Producer {
    pub fn new(
        id: usize,
        items: usize,
        latency: LatencyRange,
        offer_timeout: Duration,
        deps: WorkerDeps,
    ) -> Self {
        Self {
            name: format!("Producer-{id}"),
            id,
            items,
            latency,
            offer_timeout,
            deps,
        }
    }

    async fn offer(&self, record: Record, ctx: &CancellationToken) -> Result<bool, WorkerError> {
        let offer = self
            .deps
            .channel
            .offer(Message::Payload(record), self.offer_timeout);
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(WorkerError::Canceled),
            res = offer => Ok(res?),
        }
    }
}

#[async_trait]
impl Worker for Producer {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Role {
        Role::Producer
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
        for seq in 1..=self.items {
            sleep_or_cancel(self.latency.sample(), &ctx).await?;

            let record = Record::new(self.id, seq);
            if self.offer(record, &ctx).await? {
                self.deps.metrics.record_production();
                let size = self.deps.channel.size();
                self.deps.bus.publish(
                    Event::new(EventKind::ItemProduced)
                        .with_component(self.name.as_str())
                        .with_message(format!("ADDED {record} | Queue Size: {size}"))
                        .with_queue_size(size),
                );
            } else {
                self.deps.bus.publish(
                    Event::new(EventKind::OfferTimedOut)
                        .with_component(self.name.as_str())
                        .with_message(format!("TIMED OUT waiting to add {record}"))
                        .with_timeout(self.offer_timeout),
                );
            }
        }
        Ok(())
    }
}
