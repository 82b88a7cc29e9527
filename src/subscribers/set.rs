//! # Non-blocking event fan-out to multiple subscribers.
//!
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → tracing::warn!, keep going
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!          (bounded)
//!
//! shutdown(): close queues ─► workers drain ─► on_shutdown() ─► join
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//! - **Overflow**: event dropped for that subscriber only, reported with `tracing::warn!`
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//!
//! Overflow and panic reports go straight to `tracing` rather than back onto the bus:
//! the set is itself the bus consumer.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber panics while holding a lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::Event;

use super::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a tokio runtime. Minimum queue capacity is 1.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        tracing::warn!(
                            subscriber = sub.name(),
                            info = %panic_message(&*panic_err),
                            "subscriber panicked"
                        );
                    }
                }
                if let Err(panic_err) = std::panic::AssertUnwindSafe(sub.on_shutdown())
                    .catch_unwind()
                    .await
                {
                    tracing::warn!(
                        subscriber = sub.name(),
                        info = %panic_message(&*panic_err),
                        "subscriber panicked during shutdown"
                    );
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self { channels, workers }
    }

    /// Number of attached subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: Event) {
        let event = Arc::new(event);
        for channel in &self.channels {
            match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscriber = channel.name,
                        seq = event.seq,
                        "subscriber queue full; event dropped"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(
                        subscriber = channel.name,
                        seq = event.seq,
                        "subscriber queue closed; event dropped"
                    );
                }
            }
        }
    }

    /// Closes every queue, lets workers drain what is queued, then joins them.
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
