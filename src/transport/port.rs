//! TCP port readiness polling.
//!
//! The remote process opens its debugging port only after an unpredictable
//! startup delay. [`wait_for_port_open`] polls with raw TCP connects until
//! one succeeds or the budget runs out.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, trace};

use crate::config::ConnectionTarget;
use crate::error::{Error, Result};
use crate::resilience::duration_ms;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for a single connect attempt.
const MAX_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// wait_for_port_open
// ============================================================================

/// Waits until `target` accepts a TCP connection.
///
/// Each attempt is bounded by `min(1s, poll_interval)`, or 1s when
/// `poll_interval` is zero. The probe connection is closed immediately.
///
/// # Errors
///
/// Returns [`Error::PortNotReady`] carrying the last connect failure once
/// `budget` has elapsed.
pub async fn wait_for_port_open(
    target: &ConnectionTarget,
    budget: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let attempt_timeout = attempt_timeout(poll_interval);
    let address = (target.host().to_string(), target.port());
    let started = Instant::now();
    let mut last_error = None;
    let mut attempts: u32 = 0;

    while started.elapsed() < budget {
        attempts += 1;

        match timeout(attempt_timeout, TcpStream::connect(address.clone())).await {
            Ok(Ok(stream)) => {
                drop(stream);
                debug!(address = %target, attempts, "Port is accepting connections");
                return Ok(());
            }
            Ok(Err(e)) => {
                trace!(address = %target, attempts, error = %e, "Port not ready");
                last_error = Some(Error::Io(e));
            }
            Err(_) => {
                trace!(address = %target, attempts, "Port probe timed out");
                last_error = Some(Error::timeout(
                    format!("connect to {target}"),
                    duration_ms(attempt_timeout),
                ));
            }
        }

        sleep(poll_interval).await;
    }

    debug!(address = %target, attempts, "Port never became ready");
    Err(Error::port_not_ready(
        target.to_string(),
        duration_ms(budget),
        last_error,
    ))
}

/// Returns the bound for one connect attempt.
#[inline]
fn attempt_timeout(poll_interval: Duration) -> Duration {
    if poll_interval.is_zero() {
        MAX_ATTEMPT_TIMEOUT
    } else {
        poll_interval.min(MAX_ATTEMPT_TIMEOUT)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error as _;

    use tokio::net::TcpListener;

    /// Binds and releases an ephemeral port so nothing listens on it.
    async fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[test]
    fn test_attempt_timeout_bounds() {
        assert_eq!(attempt_timeout(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(
            attempt_timeout(Duration::from_millis(10)),
            Duration::from_millis(10)
        );
        assert_eq!(attempt_timeout(Duration::from_secs(5)), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_open_port_is_ready() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let target = ConnectionTarget::localhost(i64::from(port)).unwrap();

        wait_for_port_open(&target, Duration::from_secs(2), Duration::from_millis(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_port_opening_later_is_detected() {
        let port = free_port().await;
        let target = ConnectionTarget::localhost(i64::from(port)).unwrap();

        let opener = tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            sleep(Duration::from_secs(2)).await;
            drop(listener);
        });

        wait_for_port_open(&target, Duration::from_secs(3), Duration::from_millis(10))
            .await
            .unwrap();
        opener.abort();
    }

    #[tokio::test]
    async fn test_closed_port_times_out_after_budget() {
        let port = free_port().await;
        let target = ConnectionTarget::localhost(i64::from(port)).unwrap();
        let budget = Duration::from_millis(2000);

        let started = std::time::Instant::now();
        let err = wait_for_port_open(&target, budget, Duration::from_millis(10))
            .await
            .unwrap_err();

        assert!(started.elapsed() >= budget);
        match &err {
            Error::PortNotReady {
                target: reported,
                timeout_ms,
                ..
            } => {
                assert_eq!(reported, &target.to_string());
                assert_eq!(*timeout_ms, 2000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.source().is_some());
        assert!(!err.is_transient());
    }
}
