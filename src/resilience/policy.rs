//! Retry and reconnect policies.
//!
//! Both policies are plain values owned by the caller. A retry sequence
//! borrows its policy immutably for its whole duration.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use super::backoff::{Backoff, JitterSource};

// ============================================================================
// Constants
// ============================================================================

/// Default number of connect attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default per-attempt connect timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of reconnects per operation.
pub const DEFAULT_MAX_RECONNECTS: u32 = 3;

// ============================================================================
// RetryPolicy
// ============================================================================

/// Policy for [`RetryingConnector`](super::RetryingConnector).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    per_attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
            per_attempt_timeout: Some(DEFAULT_ATTEMPT_TIMEOUT),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy allowing `max_attempts` attempts (at least one).
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self::default().with_max_attempts(max_attempts)
    }

    /// Sets the total number of attempts, including the first.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Replaces the backoff.
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the base delay of the backoff.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.backoff = self.backoff.with_base_delay(base_delay);
        self
    }

    /// Sets the jitter ratio of the backoff.
    #[inline]
    #[must_use]
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.backoff = self.backoff.with_jitter_ratio(ratio);
        self
    }

    /// Replaces the jitter source of the backoff.
    #[inline]
    #[must_use]
    pub fn with_jitter_source(mut self, source: impl JitterSource + 'static) -> Self {
        self.backoff = self.backoff.with_jitter_source(source);
        self
    }

    /// Sets the per-attempt timeout; `None` disables it.
    #[inline]
    #[must_use]
    pub fn with_per_attempt_timeout(mut self, limit: Option<Duration>) -> Self {
        self.per_attempt_timeout = limit;
        self
    }

    /// Returns the total number of attempts.
    #[inline]
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff.
    #[inline]
    #[must_use]
    pub const fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Returns the per-attempt timeout.
    #[inline]
    #[must_use]
    pub const fn per_attempt_timeout(&self) -> Option<Duration> {
        self.per_attempt_timeout
    }
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Policy for [`ReconnectManager::with_operation`](super::ReconnectManager::with_operation).
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_reconnects: u32,
    backoff: Backoff,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_reconnects: DEFAULT_MAX_RECONNECTS,
            backoff: Backoff::default(),
        }
    }
}

impl ReconnectPolicy {
    /// Creates a policy allowing `max_reconnects` reconnects per operation.
    #[must_use]
    pub fn new(max_reconnects: u32) -> Self {
        Self {
            max_reconnects,
            ..Self::default()
        }
    }

    /// Replaces the backoff.
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns the number of reconnects allowed per operation.
    #[inline]
    #[must_use]
    pub const fn max_reconnects(&self) -> u32 {
        self.max_reconnects
    }

    /// Returns the backoff.
    #[inline]
    #[must_use]
    pub const fn backoff(&self) -> &Backoff {
        &self.backoff
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::resilience::FixedJitter;

    #[test]
    fn test_retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(policy.per_attempt_timeout(), Some(DEFAULT_ATTEMPT_TIMEOUT));
    }

    #[test]
    fn test_max_attempts_at_least_one() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::new(7).max_attempts(), 7);
    }

    #[test]
    fn test_with_base_delay_keeps_jitter_settings() {
        let policy = RetryPolicy::default()
            .with_jitter_ratio(0.5)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter_source(FixedJitter::none());

        assert_eq!(policy.backoff().base_delay(), Duration::from_millis(1));
        assert_eq!(policy.backoff().jitter_ratio(), 0.5);
        assert_eq!(policy.backoff().delay_for_attempt(2), Duration::from_millis(4));
    }

    #[test]
    fn test_reconnect_policy() {
        let policy = ReconnectPolicy::new(5);
        assert_eq!(policy.max_reconnects(), 5);
        assert_eq!(ReconnectPolicy::default().max_reconnects(), DEFAULT_MAX_RECONNECTS);
    }
}
