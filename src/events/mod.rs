//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** every component
//! logs through. Events are `(component, message)` pairs plus a kind, a global
//! sequence number and a timestamp; sinks decide how to render and persist them.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`Severity`] event classification and payload
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: producers, consumers, `WorkerPool`, `AutoScaler`,
//!   `ShutdownCoordinator`, `Engine`.
//! - **Consumers**: the engine's listener, which fans out to a `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, Severity};
