//! Error types used by the queuevisor runtime and its workers.
//!
//! This module defines four enums:
//!
//! - [`ConfigError`] - invalid parameters, raised before any worker exists.
//! - [`ChannelError`] - rejected channel operations (no state change).
//! - [`WorkerError`] - why a producer/consumer loop ended early.
//! - [`ShutdownError`] - a shutdown phase exceeded its bound.
//!
//! All of them provide `as_label` (stable snake_case label for logs/metrics).
//! Offer/poll timeouts are **not** errors: they surface as
//! `false` / `None` and the caller decides what happens next.

use std::time::Duration;
use thiserror::Error;

/// # Invalid configuration.
///
/// Fatal: returned by constructors before any worker is created.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A count parameter was zero (all counts must be positive).
    #[error("{field} must be positive, got {value}")]
    NonPositive {
        /// Name of the offending parameter.
        field: &'static str,
        /// The rejected value.
        value: usize,
    },

    /// Channel capacity exceeds what the runtime can represent.
    #[error("queue capacity {capacity} exceeds maximum {max}")]
    CapacityTooLarge {
        /// Requested capacity.
        capacity: usize,
        /// Largest supported capacity.
        max: usize,
    },

    /// A tuning knob is out of its valid range.
    #[error("invalid tuning: {reason}")]
    InvalidTuning {
        /// What is wrong with the tuning.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use queuevisor::ConfigError;
    ///
    /// let err = ConfigError::NonPositive { field: "queue_capacity", value: 0 };
    /// assert_eq!(err.as_label(), "config_non_positive");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NonPositive { .. } => "config_non_positive",
            ConfigError::CapacityTooLarge { .. } => "config_capacity_too_large",
            ConfigError::InvalidTuning { .. } => "config_invalid_tuning",
        }
    }
}

/// # Rejected channel operation.
///
/// Raised immediately, before any waiting; the channel is left untouched.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// Attempt to enqueue an absent item.
    #[error("cannot enqueue an absent item")]
    InvalidItem,
}

impl ChannelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::InvalidItem => "channel_invalid_item",
        }
    }
}

/// # Reasons a worker loop stops before finishing its work.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    /// A wait or sleep was cancelled by the worker's role token.
    #[error("worker cancelled")]
    Canceled,

    /// The channel rejected an operation.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Canceled => "worker_canceled",
            WorkerError::Channel(e) => e.as_label(),
        }
    }
}

/// # Shutdown phase overran its bound.
///
/// Never aborts the sequence: it is logged as a warning and the stragglers are
/// force-cancelled before the next phase begins.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// A stop/wait phase did not complete within its timeout.
    #[error("{phase} did not finish within {timeout:?}; stuck: {stuck:?}; forcing cancellation")]
    PhaseTimeout {
        /// Phase name (e.g. `"producers"`).
        phase: &'static str,
        /// The configured bound.
        timeout: Duration,
        /// Workers still alive when the bound elapsed.
        stuck: Vec<String>,
    },

    /// The sentinel could not be deposited within its bound.
    #[error("shutdown sentinel not inserted within {timeout:?}")]
    SentinelTimeout {
        /// The configured bound.
        timeout: Duration,
    },
}

impl ShutdownError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use queuevisor::ShutdownError;
    /// use std::time::Duration;
    ///
    /// let err = ShutdownError::PhaseTimeout {
    ///     phase: "consumers",
    ///     timeout: Duration::from_secs(30),
    ///     stuck: vec![],
    /// };
    /// assert_eq!(err.as_label(), "shutdown_phase_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ShutdownError::PhaseTimeout { .. } => "shutdown_phase_timeout",
            ShutdownError::SentinelTimeout { .. } => "shutdown_sentinel_timeout",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ShutdownError::PhaseTimeout {
                phase,
                timeout,
                stuck,
            } => format!("{phase} exceeded {timeout:?}; stuck workers={stuck:?}"),
            ShutdownError::SentinelTimeout { timeout } => {
                format!("sentinel insertion exceeded {timeout:?}")
            }
        }
    }
}
