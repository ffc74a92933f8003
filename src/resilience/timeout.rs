//! Deadline wrapper for pending operations.
//!
//! A timed-out operation is abandoned: its future is dropped, so a late
//! result can never reach the caller.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};

use super::duration_ms;

// ============================================================================
// with_timeout
// ============================================================================

/// Races `operation` against a deadline.
///
/// `None` or a zero duration passes the operation through unmodified.
///
/// # Arguments
///
/// * `operation` - The fallible future to run
/// * `limit` - Maximum time to wait
/// * `label` - Operation name reported in the timeout error
///
/// # Errors
///
/// - [`Error::Timeout`] if the deadline elapses first
/// - Any error produced by `operation` itself
pub async fn with_timeout<F, T>(operation: F, limit: Option<Duration>, label: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(limit) = limit.filter(|l| !l.is_zero()) else {
        return operation.await;
    };

    match timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = duration_ms(limit);
            debug!(operation = label, timeout_ms, "Operation timed out");
            Err(Error::timeout(label, timeout_ms))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
