//! # Run configuration.
//!
//! Provides [`Config`], the validated parameters of one run, and [`Tuning`], the
//! timing and scaling knobs shared by the pool, the workers, the auto-scaler and
//! the shutdown sequence.
//!
//! Config is used in two ways:
//! 1. **Engine creation**: `EngineBuilder::new(config)`
//! 2. **Derived values**: [`Config::total_expected_items`]
//!
//! ## Rules
//! - The four counts are validated **once** in [`Config::new`]; zero is rejected.
//! - After construction the counts are read-only (getters only).
//! - `Tuning` is validated by [`Config::with_tuning`].

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;
use crate::workers::LatencyRange;

/// Upper bound for [`Tuning::max_emergency_consumers`].
pub const MAX_EMERGENCY_CONSUMERS: usize = 3;

/// Timing and scaling knobs.
///
/// ## Field semantics
/// - `offer_timeout`: bound on a producer's `offer` before the item is dropped
/// - `producer_latency` / `consumer_latency`: simulated per-item work
/// - `scale_interval`: auto-scaler sampling period (first tick is immediate)
/// - `scale_threshold`: load ratio that must be **exceeded** to add a consumer
/// - `max_emergency_consumers`: ceiling on scaler-spawned consumers (at most [`MAX_EMERGENCY_CONSUMERS`])
/// - `scaler_stop_timeout`: wait for the scaler loop after cancelling it
/// - `producer_stop_timeout`: phase 1 bound for in-flight producers
/// - `producer_force_grace`: wait after force-cancelling producers before abort
/// - `consumer_drain_timeout`: phase 3 bound for consumers to drain and exit
/// - `consumer_force_grace`: wait after force-cancelling consumers before abort
/// - `completion_poll`: how often the engine checks for run completion
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct Tuning {
    pub offer_timeout: Duration,
    pub producer_latency: LatencyRange,
    pub consumer_latency: LatencyRange,
    pub scale_interval: Duration,
    pub scale_threshold: f64,
    pub max_emergency_consumers: usize,
    pub scaler_stop_timeout: Duration,
    pub producer_stop_timeout: Duration,
    pub producer_force_grace: Duration,
    pub consumer_drain_timeout: Duration,
    pub consumer_force_grace: Duration,
    pub completion_poll: Duration,
    pub bus_capacity: usize,
}

impl Tuning {
    /// Tuning with zero simulated latency, handy for tests and benchmarks.
    pub fn immediate() -> Self {
        Self {
            producer_latency: LatencyRange::ZERO,
            consumer_latency: LatencyRange::ZERO,
            ..Self::default()
        }
    }

    /// Checks ranges that cannot be represented in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale_threshold > 0.0 && self.scale_threshold <= 1.0) {
            return Err(ConfigError::InvalidTuning {
                reason: format!(
                    "scale_threshold must be in (0, 1], got {}",
                    self.scale_threshold
                ),
            });
        }
        if self.max_emergency_consumers > MAX_EMERGENCY_CONSUMERS {
            return Err(ConfigError::InvalidTuning {
                reason: format!(
                    "max_emergency_consumers must be at most {MAX_EMERGENCY_CONSUMERS}, got {}",
                    self.max_emergency_consumers
                ),
            });
        }
        if self.scale_interval.is_zero() {
            return Err(ConfigError::InvalidTuning {
                reason: "scale_interval must be non-zero".into(),
            });
        }
        if self.completion_poll.is_zero() {
            return Err(ConfigError::InvalidTuning {
                reason: "completion_poll must be non-zero".into(),
            });
        }
        Ok(())
    }
}

impl Default for Tuning {
    /// Defaults:
    ///
    /// - `offer_timeout = 2s`
    /// - `producer_latency = 50..150ms`, `consumer_latency = 50..250ms`
    /// - `scale_interval = 1s`, `scale_threshold = 0.75`, `max_emergency_consumers = 3`
    /// - `scaler_stop_timeout = 2s`, `producer_stop_timeout = 10s`, `producer_force_grace = 2s`
    /// - `consumer_drain_timeout = 30s`, `consumer_force_grace = 5s`
    /// - `completion_poll = 100ms`, `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            offer_timeout: Duration::from_secs(2),
            producer_latency: LatencyRange::from_millis(50, 150),
            consumer_latency: LatencyRange::from_millis(50, 250),
            scale_interval: Duration::from_secs(1),
            scale_threshold: 0.75,
            max_emergency_consumers: MAX_EMERGENCY_CONSUMERS,
            scaler_stop_timeout: Duration::from_secs(2),
            producer_stop_timeout: Duration::from_secs(10),
            producer_force_grace: Duration::from_secs(2),
            consumer_drain_timeout: Duration::from_secs(30),
            consumer_force_grace: Duration::from_secs(5),
            completion_poll: Duration::from_millis(100),
            bus_capacity: 1024,
        }
    }
}

/// Validated parameters of one run.
#[derive(Clone, Debug)]
pub struct Config {
    producers: usize,
    items_per_producer: usize,
    consumers: usize,
    queue_capacity: usize,
    /// Timing and scaling knobs.
    pub tuning: Tuning,
}

impl Config {
    /// Validates the four counts and builds a config with default [`Tuning`].
    ///
    /// # Example
    /// ```
    /// use queuevisor::Config;
    ///
    /// let cfg = Config::new(2, 5, 1, 10).unwrap();
    /// assert_eq!(cfg.total_expected_items(), 10);
    /// assert!(Config::new(2, 5, 0, 10).is_err());
    /// ```
    pub fn new(
        producers: usize,
        items_per_producer: usize,
        consumers: usize,
        queue_capacity: usize,
    ) -> Result<Self, ConfigError> {
        let checks = [
            ("producers", producers),
            ("items_per_producer", items_per_producer),
            ("consumers", consumers),
            ("queue_capacity", queue_capacity),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(Self {
            producers,
            items_per_producer,
            consumers,
            queue_capacity,
            tuning: Tuning::default(),
        })
    }

    /// The built-in configuration: 4 producers × 20 items, 2 consumers, capacity 10.
    pub fn defaults() -> Self {
        Self {
            producers: 4,
            items_per_producer: 20,
            consumers: 2,
            queue_capacity: 10,
            tuning: Tuning::default(),
        }
    }

    /// Replaces the tuning after validating it.
    pub fn with_tuning(mut self, tuning: Tuning) -> Result<Self, ConfigError> {
        tuning.validate()?;
        self.tuning = tuning;
        Ok(self)
    }

    #[inline]
    pub fn producers(&self) -> usize {
        self.producers
    }

    #[inline]
    pub fn items_per_producer(&self) -> usize {
        self.items_per_producer
    }

    #[inline]
    pub fn consumers(&self) -> usize {
        self.consumers
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// `producers × items_per_producer` (saturating).
    #[inline]
    pub fn total_expected_items(&self) -> u64 {
        (self.producers as u64).saturating_mul(self.items_per_producer as u64)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.tuning.bus_capacity.max(1)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Configuration{{producers={}, itemsPerProducer={}, consumers={}, capacity={}, totalItems={}}}",
            self.producers,
            self.items_per_producer,
            self.consumers,
            self.queue_capacity,
            self.total_expected_items()
        )
    }
}
