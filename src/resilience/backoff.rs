//! Jittered exponential backoff.
//!
//! `delay = base_delay * 2^attempt`, randomised by ± `jitter_ratio` of its
//! value and floored at zero. Growth is uncapped unless
//! [`Backoff::with_max_delay`] is set.
//!
//! The random source is injectable through [`JitterSource`] so tests can
//! pin the jitter.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

// ============================================================================
// Constants
// ============================================================================

/// Default base delay for the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(250);

/// Default jitter ratio (±20%).
pub const DEFAULT_JITTER_RATIO: f64 = 0.2;

/// Exponent ceiling keeping `2^attempt` finite in `f64`.
const MAX_EXPONENT: u32 = 1000;

// ============================================================================
// JitterSource
// ============================================================================

/// Source of jitter samples.
pub trait JitterSource: Send + Sync {
    /// Returns a sample in `[-1.0, 1.0]`.
    fn sample(&self) -> f64;
}

/// Thread-local RNG jitter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&self) -> f64 {
        rand::rng().random_range(-1.0..=1.0)
    }
}

/// Constant jitter sample, for deterministic delays.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(f64);

impl FixedJitter {
    /// Creates a fixed sample, clamped to `[-1.0, 1.0]`.
    #[inline]
    #[must_use]
    pub fn new(sample: f64) -> Self {
        Self(sample.clamp(-1.0, 1.0))
    }

    /// No jitter at all.
    #[inline]
    #[must_use]
    pub const fn none() -> Self {
        Self(0.0)
    }
}

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0
    }
}

// ============================================================================
// Backoff
// ============================================================================

/// Exponential backoff with jitter.
#[derive(Clone)]
pub struct Backoff {
    base_delay: Duration,
    jitter_ratio: f64,
    max_delay: Option<Duration>,
    jitter: Arc<dyn JitterSource>,
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff")
            .field("base_delay", &self.base_delay)
            .field("jitter_ratio", &self.jitter_ratio)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DELAY)
    }
}

impl Backoff {
    /// Creates a backoff with the default jitter ratio and random jitter.
    #[must_use]
    pub fn new(base_delay: Duration) -> Self {
        Self {
            base_delay,
            jitter_ratio: DEFAULT_JITTER_RATIO,
            max_delay: None,
            jitter: Arc::new(RandomJitter),
        }
    }

    /// Sets the base delay.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the jitter ratio, clamped to `[0.0, 1.0]`.
    #[inline]
    #[must_use]
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        self
    }

    /// Caps the nominal delay.
    #[inline]
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Replaces the random source.
    #[inline]
    #[must_use]
    pub fn with_jitter_source(mut self, source: impl JitterSource + 'static) -> Self {
        self.jitter = Arc::new(source);
        self
    }

    /// Returns the base delay.
    #[inline]
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the jitter ratio.
    #[inline]
    #[must_use]
    pub const fn jitter_ratio(&self) -> f64 {
        self.jitter_ratio
    }

    /// Returns the delay cap, if any.
    #[inline]
    #[must_use]
    pub const fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Returns the jittered delay before retry number `attempt` (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.delay_with_sample(attempt, self.jitter.sample())
    }

    /// Returns the delay for `attempt` given an explicit jitter sample.
    #[must_use]
    pub fn delay_with_sample(&self, attempt: u32, sample: f64) -> Duration {
        let nominal = self.nominal_nanos(attempt);
        if nominal >= u64::MAX as f64 {
            // Past the representable range; jitter cannot bring it back.
            return Duration::MAX;
        }
        let sample = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };

        nanos_to_duration(nominal + nominal * self.jitter_ratio * sample)
    }

    /// Returns the un-jittered delay for `attempt`.
    #[must_use]
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        nanos_to_duration(self.nominal_nanos(attempt))
    }

    fn nominal_nanos(&self, attempt: u32) -> f64 {
        let exponent = attempt.min(MAX_EXPONENT) as i32;
        let nominal = self.base_delay.as_nanos() as f64 * 2f64.powi(exponent);

        match self.max_delay {
            Some(max) => nominal.min(max.as_nanos() as f64),
            None => nominal,
        }
    }
}

/// Converts nanoseconds to a duration, flooring at zero and saturating.
fn nanos_to_duration(nanos: f64) -> Duration {
    if nanos.is_nan() || nanos <= 0.0 {
        Duration::ZERO
    } else if nanos >= u64::MAX as f64 {
        Duration::MAX
    } else {
        Duration::from_nanos(nanos.round() as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn exact(base_ms: u64) -> Backoff {
        Backoff::new(Duration::from_millis(base_ms)).with_jitter_source(FixedJitter::none())
    }

    #[test]
    fn test_exponential_growth() {
        let backoff = exact(100);
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(backoff.delay_for_attempt(5), Duration::from_millis(3200));
    }

    #[test]
    fn test_jitter_bounds() {
        let backoff = exact(100).with_jitter_ratio(0.5);
        assert_eq!(backoff.delay_with_sample(1, 1.0), Duration::from_millis(300));
        assert_eq!(backoff.delay_with_sample(1, -1.0), Duration::from_millis(100));
    }

    #[test]
    fn test_full_jitter_floors_at_zero() {
        let backoff = exact(100).with_jitter_ratio(1.0);
        assert_eq!(backoff.delay_with_sample(3, -1.0), Duration::ZERO);
    }

    #[test]
    fn test_random_jitter_within_range() {
        let backoff = Backoff::new(Duration::from_millis(1000)).with_jitter_ratio(0.1);
        for _ in 0..200 {
            let delay = backoff.delay_for_attempt(0);
            assert!(delay >= Duration::from_millis(900), "{delay:?}");
            assert!(delay <= Duration::from_millis(1100), "{delay:?}");
        }
    }

    #[test]
    fn test_uncapped_by_default() {
        let backoff = exact(1000);
        assert!(backoff.max_delay().is_none());
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(1024));
    }

    #[test]
    fn test_max_delay_caps_nominal() {
        let backoff = exact(100).with_max_delay(Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(800));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_secs(1));
        assert_eq!(backoff.nominal_delay(30), Duration::from_secs(1));
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let backoff = exact(100);
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::MAX);
    }

    #[test]
    fn test_delay_never_shrinks_after_overflow() {
        let backoff = exact(250);
        assert_eq!(backoff.delay_for_attempt(995), Duration::MAX);
        assert_eq!(backoff.delay_for_attempt(1000), Duration::MAX);

        let backoff = exact(250).with_jitter_ratio(1.0);
        assert_eq!(backoff.delay_with_sample(1000, -0.5), Duration::MAX);
        assert_eq!(backoff.delay_with_sample(1000, 0.0), Duration::MAX);
        assert_eq!(backoff.delay_with_sample(1000, 1.0), Duration::MAX);
        assert_eq!(backoff.nominal_delay(1000), Duration::MAX);
    }

    #[test]
    fn test_jitter_ratio_clamped() {
        assert_eq!(exact(1).with_jitter_ratio(7.0).jitter_ratio(), 1.0);
        assert_eq!(exact(1).with_jitter_ratio(-1.0).jitter_ratio(), 0.0);
        assert_eq!(exact(1).with_jitter_ratio(f64::NAN).jitter_ratio(), 0.0);
    }

    #[test]
    fn test_fixed_jitter_clamped() {
        assert_eq!(FixedJitter::new(3.0).sample(), 1.0);
        assert_eq!(FixedJitter::new(-3.0).sample(), -1.0);
    }
}
