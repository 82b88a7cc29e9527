//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from many sources (workers, pool, scaler,
//! shutdown coordinator).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                  Subscriber (one):
//!   Producer-N ──┐
//!   Consumer-N ──┼──────► Bus ───────► engine listener ────► SubscriberSet
//!   AutoScaler ──┤  (broadcast chan)
//!   Shutdown   ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and never fails.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally an `Arc`-backed sender); every component that logs
/// holds its own clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers, the event is dropped; logging failures are never
    /// surfaced to the caller.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Shorthand for publishing a plain [`EventKind::Log`](super::EventKind::Log) line.
    pub fn log(&self, component: &str, message: impl Into<std::sync::Arc<str>>) {
        self.publish(Event::log(component, message));
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
