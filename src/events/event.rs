//! # Runtime events emitted by workers, the pool and the shutdown sequence.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Worker lifecycle**: started, stopped, cancelled, aborted, spawn rejected
//! - **Item flow**: produced, offer timed out, consumed, sentinel received
//! - **Scaling**: scaler started, scaled up
//! - **Shutdown**: requested, phase started/completed/timed out, sentinel inserted, completed
//!
//! The [`Event`] struct carries the `(component, message)` pair that sinks render,
//! plus optional structured fields.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use queuevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ItemProduced)
//!     .with_component("Producer-1")
//!     .with_message("ADDED Record-1-1 | Queue Size: 1")
//!     .with_queue_size(1);
//!
//! assert_eq!(ev.kind, EventKind::ItemProduced);
//! assert_eq!(ev.component.as_deref(), Some("Producer-1"));
//! assert_eq!(ev.queue_size, Some(1));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Free-form system line (startup, completion, report).
    Log,

    // === Worker lifecycle ===
    /// Worker spawned and registered.
    ///
    /// Sets: `component` (worker name).
    WorkerStarted,

    /// Worker finished its loop normally (all items produced, or sentinel relayed).
    WorkerStopped,

    /// Worker exited because its role token was cancelled.
    WorkerCanceled,

    /// Worker did not react to cancellation in time and was aborted.
    WorkerAborted,

    /// Spawn refused because the role no longer accepts work.
    SpawnRejected,

    // === Item flow ===
    /// Producer inserted an item.
    ///
    /// Sets: `component`, `message`, `queue_size`.
    ItemProduced,

    /// Producer's bounded offer elapsed; the item was dropped.
    ///
    /// Sets: `component`, `message`, `timeout_ms`.
    OfferTimedOut,

    /// Consumer took an item.
    ///
    /// Sets: `component`, `message`, `queue_size`.
    ItemConsumed,

    /// Consumer observed the sentinel, relayed it and is exiting.
    SentinelReceived,

    // === Scaling ===
    /// Auto-scaler loop started.
    ScalerStarted,

    /// Auto-scaler deployed an emergency consumer.
    ///
    /// Sets: `component`, `message`, `queue_size`.
    ScaledUp,

    // === Shutdown ===
    /// Shutdown sequence entered (explicit call or OS signal).
    ShutdownRequested,

    /// A shutdown phase began.
    PhaseStarted,

    /// A shutdown phase finished within its bound.
    PhaseCompleted,

    /// A shutdown phase exceeded its bound; stragglers are force-cancelled.
    ///
    /// Sets: `component`, `message`, `timeout_ms`.
    PhaseTimedOut,

    /// The sentinel was deposited in the channel.
    SentinelInserted,

    /// All phases done.
    ShutdownCompleted,
}

/// How loudly a sink should report an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
}

impl EventKind {
    /// Default severity for this kind.
    pub fn severity(self) -> Severity {
        match self {
            EventKind::ItemProduced | EventKind::ItemConsumed => Severity::Debug,
            EventKind::OfferTimedOut
            | EventKind::WorkerAborted
            | EventKind::SpawnRejected
            | EventKind::ScaledUp
            | EventKind::PhaseTimedOut => Severity::Warn,
            _ => Severity::Info,
        }
    }

    /// Short stable label (kebab-case) for compact renderings.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::Log => "log",
            EventKind::WorkerStarted => "worker-started",
            EventKind::WorkerStopped => "worker-stopped",
            EventKind::WorkerCanceled => "worker-canceled",
            EventKind::WorkerAborted => "worker-aborted",
            EventKind::SpawnRejected => "spawn-rejected",
            EventKind::ItemProduced => "item-produced",
            EventKind::OfferTimedOut => "offer-timed-out",
            EventKind::ItemConsumed => "item-consumed",
            EventKind::SentinelReceived => "sentinel-received",
            EventKind::ScalerStarted => "scaler-started",
            EventKind::ScaledUp => "scaled-up",
            EventKind::ShutdownRequested => "shutdown-requested",
            EventKind::PhaseStarted => "phase-started",
            EventKind::PhaseCompleted => "phase-completed",
            EventKind::PhaseTimedOut => "phase-timed-out",
            EventKind::SentinelInserted => "sentinel-inserted",
            EventKind::ShutdownCompleted => "shutdown-completed",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (sinks format it)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Emitting component (worker name, `"SYSTEM"`, `"AUTO-SCALER"`, ...).
    pub component: Option<Arc<str>>,
    /// Human-readable line.
    pub message: Option<Arc<str>>,
    /// Channel occupancy observed by the publisher.
    pub queue_size: Option<usize>,
    /// Relevant bound in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            component: None,
            message: None,
            queue_size: None,
            timeout_ms: None,
        }
    }

    /// Plain `(component, message)` line.
    pub fn log(component: &str, message: impl Into<Arc<str>>) -> Self {
        Event::new(EventKind::Log)
            .with_component(component)
            .with_message(message)
    }

    #[inline]
    pub fn with_component(mut self, component: impl Into<Arc<str>>) -> Self {
        self.component = Some(component.into());
        self
    }

    #[inline]
    pub fn with_message(mut self, message: impl Into<Arc<str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[inline]
    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = Some(size);
        self
    }

    /// Attaches a bound (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Component name, or `"SYSTEM"` when none was attached.
    #[inline]
    pub fn component_or_system(&self) -> &str {
        self.component.as_deref().unwrap_or("SYSTEM")
    }

    /// Message text, or the kind's label when none was attached.
    #[inline]
    pub fn message_or_label(&self) -> &str {
        self.message.as_deref().unwrap_or(self.kind.as_label())
    }
}
