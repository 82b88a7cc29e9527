//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the built-in sinks for events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Workers ── publish(Event) ──► Bus ──► engine listener ──► SubscriberSet::emit
//!                                                              │
//!                                                  ┌───────────┼───────────┐
//!                                                  ▼           ▼           ▼
//!                                              LogWriter   EventLog     Custom
//!                                              (tracing)   (file)
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use queuevisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct ScaleAlerts;
//!
//! #[async_trait]
//! impl Subscribe for ScaleAlerts {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::ScaledUp {
//!             // page someone
//!         }
//!     }
//! }
//! ```

mod embedded;
mod set;
mod subscribe;

pub use embedded::{EventLog, LogWriter};
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
