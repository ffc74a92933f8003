//! Retry, timeout and reconnection primitives.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `classify` | Transient-vs-fatal error classification |
//! | `timeout` | Deadline wrapper for pending operations |
//! | `backoff` | Exponential backoff with jitter |
//! | `policy` | Retry and reconnect budgets |
//! | `connector` | Bounded connection establishment |
//! | `manager` | Cached session with transparent reconnection |

// ============================================================================
// Modules
// ============================================================================

mod backoff;
mod classify;
mod connector;
mod manager;
mod policy;
mod timeout;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::{
    Backoff, DEFAULT_BASE_DELAY, DEFAULT_JITTER_RATIO, FixedJitter, JitterSource, RandomJitter,
};
pub use classify::{is_stale_endpoint, is_transient, message_is_transient};
pub use connector::RetryingConnector;
pub use manager::{ManagerState, ReconnectManager};
pub use policy::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_RECONNECTS, ReconnectPolicy,
    RetryPolicy,
};
pub use timeout::with_timeout;

// ============================================================================
// Helpers
// ============================================================================

use std::time::Duration;

/// Converts a duration to whole milliseconds for error and log fields.
#[inline]
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
