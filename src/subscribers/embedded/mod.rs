//! Built-in subscribers.

mod event_log;
mod log;

pub use event_log::EventLog;
pub use log::LogWriter;
