//! # Simulated per-item latency.
//!
//! [`LatencyRange`] draws a uniformly random delay in `[min, max)` for each item a
//! worker handles. A degenerate range (`min == max`) always yields `min`.

use rand::Rng;
use std::time::Duration;

/// Half-open range of per-item delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatencyRange {
    min: Duration,
    max: Duration,
}

impl LatencyRange {
    /// No simulated latency.
    pub const ZERO: LatencyRange = LatencyRange {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Builds a range; bounds given in the wrong order are swapped.
    pub fn new(a: Duration, b: Duration) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    pub fn from_millis(a: u64, b: u64) -> Self {
        Self::new(Duration::from_millis(a), Duration::from_millis(b))
    }

    /// Always the same delay.
    pub fn fixed(d: Duration) -> Self {
        Self { min: d, max: d }
    }

    #[inline]
    pub fn min(&self) -> Duration {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws one delay.
    pub fn sample(&self) -> Duration {
        let lo = self.min.as_micros() as u64;
        let hi = self.max.as_micros() as u64;
        if lo >= hi {
            return self.min;
        }
        let mut rng = rand::rng();
        Duration::from_micros(rng.random_range(lo..hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_bounds() {
        let range = LatencyRange::from_millis(50, 150);
        for _ in 0..200 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(50), "{d:?} below min");
            assert!(d < Duration::from_millis(150), "{d:?} not below max");
        }
    }

    #[test]
    fn test_reversed_bounds_are_swapped() {
        let range = LatencyRange::from_millis(250, 50);
        assert_eq!(range.min(), Duration::from_millis(50));
        assert_eq!(range.max(), Duration::from_millis(250));
    }

    #[test]
    fn test_degenerate_ranges() {
        assert_eq!(LatencyRange::ZERO.sample(), Duration::ZERO);
        let fixed = LatencyRange::fixed(Duration::from_millis(5));
        assert_eq!(fixed.sample(), Duration::from_millis(5));
    }
}
