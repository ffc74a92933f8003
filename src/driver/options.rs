//! Discovery options.
//!
//! # Example
//!
//! ```ignore
//! use devtools_reconnect::DiscoveryOptions;
//!
//! let options = DiscoveryOptions::new()
//!     .with_timeout(Duration::from_secs(10))
//!     .with_poll_interval(Duration::from_millis(50));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::transport::{DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_POLL_INTERVAL};

// ============================================================================
// DiscoveryOptions
// ============================================================================

/// Budget for finding the control-channel address of a target.
///
/// The same budget covers waiting for the port and polling the metadata
/// endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Total time allowed per discovery.
    pub timeout: Duration,

    /// Delay between polls.
    pub poll_interval: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryOptions {
    /// Creates options with the default budget (30s, polling every 100ms).
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the total budget.
    #[inline]
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[inline]
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DiscoveryOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_builder_chain() {
        let options = DiscoveryOptions::new()
            .with_timeout(Duration::from_secs(5))
            .with_poll_interval(Duration::from_millis(10));

        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.poll_interval, Duration::from_millis(10));
    }
}
