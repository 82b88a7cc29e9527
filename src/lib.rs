//! # queuevisor
//!
//! **Queuevisor** is a bounded producer/consumer runtime for tokio.
//!
//! It moves records from a set of producers to a set of consumers through a fixed
//! capacity channel with fair (arrival-ordered) backpressure, adds emergency
//! consumers when the channel stays nearly full, and shuts everything down in three
//! phases without losing or duplicating an item.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌────────────┐ ┌────────────┐ ┌────────────┐
//!   │ Producer-1 │ │ Producer-2 │ │ Producer-N │   offer(record, 2s)
//!   └─────┬──────┘ └─────┬──────┘ └─────┬──────┘
//!         ▼              ▼              ▼
//! ┌───────────────────────────────────────────────┐
//! │ BoundedChannel<Message<Record>>  (capacity C) │◄── AutoScaler samples size / C
//! │  Mutex<VecDeque> + slots/items semaphores     │      └─► EmergencyConsumer-k
//! └───────┬───────────────┬───────────────┬───────┘
//!         ▼               ▼               ▼          take()
//!   ┌────────────┐  ┌────────────┐  ┌─────────────────────┐
//!   │ Consumer-1 │  │ Consumer-2 │  │ EmergencyConsumer-1 │
//!   └────────────┘  └────────────┘  └─────────────────────┘
//!
//! every component ── publish(Event) ──► Bus ──► SubscriberSet ──► LogWriter / EventLog / ...
//! ```
//!
//! ### Shutdown
//! ```text
//! Running
//!   └─► ProducersStopping   cancel AutoScaler, wait producers (≤ 10s, then force)
//!         └─► SentinelInserted    put(Message::Shutdown)
//!               └─► ConsumersDraining   each consumer relays the sentinel and exits (≤ 30s)
//!                     └─► Terminated    channel holds exactly the sentinel
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Channel**       | Fair bounded FIFO with blocking and timed operations.    | [`BoundedChannel`], [`Message`]             |
//! | **Workers**       | Producer and consumer roles, cancellable at every wait.  | [`Worker`], [`Producer`], [`Consumer`]      |
//! | **Pool**          | Live counts, emergency cap, bounded force-stop.          | [`WorkerPool`], [`AutoScaler`]              |
//! | **Shutdown**      | Three-phase state machine with a cached report.          | [`ShutdownCoordinator`], [`ShutdownReport`] |
//! | **Subscriber API**| Hook into events (logging, file history, custom).        | [`Subscribe`], [`LogWriter`], [`EventLog`]  |
//! | **Metrics**       | Produced/consumed counters behind a trait.               | [`MetricsCollector`], [`SystemMetrics`]     |
//! | **Errors**        | Typed errors for config, channel, workers and shutdown.  | [`ConfigError`], [`ShutdownError`]          |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use queuevisor::{Config, EngineBuilder, LogWriter, Subscribe, Tuning};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::new(2, 5, 1, 10)?.with_tuning(Tuning::immediate())?;
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let engine = EngineBuilder::new(cfg).with_subscribers(subs).build()?;
//!     let summary = engine.run(&CancellationToken::new()).await;
//!     engine.close().await;
//!
//!     assert!(summary.is_success());
//!     assert_eq!(summary.final_size, 1);
//!     Ok(())
//! }
//! ```
mod channel;
mod config;
mod core;
mod error;
mod events;
mod metrics;
mod status;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use crate::core::{
    AutoScaler, Completion, Engine, EngineBuilder, PhaseOutcome, RunSummary, ScaleDecision,
    ShutdownCoordinator, ShutdownReport, ShutdownState, ShutdownTimeouts, WorkerPool,
    wait_for_shutdown_signal,
};
pub use channel::{BoundedChannel, Message};
pub use config::{Config, MAX_EMERGENCY_CONSUMERS, Tuning};
pub use error::{ChannelError, ConfigError, ShutdownError, WorkerError};
pub use events::{Bus, Event, EventKind, Severity};
pub use metrics::{MetricsCollector, SystemMetrics};
pub use status::{Dashboard, StatusProbe, StatusSnapshot};
pub use subscribers::{EventLog, LogWriter, Subscribe, SubscriberSet};
pub use workers::{
    Consumer, LatencyRange, Producer, Record, RecordChannel, Role, Worker, WorkerDeps, WorkerRef,
};
