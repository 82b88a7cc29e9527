//! # LogWriter: forwards events to `tracing`.
//!
//! Each event becomes one `tracing` record at the level given by
//! [`EventKind::severity`](crate::events::EventKind::severity):
//!
//! ```text
//! DEBUG queuevisor: ADDED Record-1-3 | Queue Size: 2 component="Producer-1" kind="item-produced"
//! WARN  queuevisor: Deploying Emergency Consumer 1 component="AUTO-SCALER" kind="scaled-up"
//! WARN  queuevisor: TIMED OUT waiting to add Record-2-7 component="Producer-2" kind="offer-timed-out"
//! ```

use async_trait::async_trait;

use crate::events::{Event, Severity};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let component = e.component_or_system();
        let kind = e.kind.as_label();
        let message = e.message_or_label();
        match e.severity() {
            Severity::Debug => tracing::debug!(component, kind, "{message}"),
            Severity::Info => tracing::info!(component, kind, "{message}"),
            Severity::Warn => {
                tracing::warn!(component, kind, timeout_ms = e.timeout_ms, "{message}")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
