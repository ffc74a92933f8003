//! Bounded-retry connection establishment.
//!
//! The connector never knows how a session is built. It resolves an
//! address, hands it to a caller-supplied `connect` step under a
//! per-attempt deadline, and decides between retrying and giving up.
//!
//! # Example
//!
//! ```ignore
//! use devtools_reconnect::{RetryPolicy, RetryingConnector, WsSession};
//!
//! let connector = RetryingConnector::new(RetryPolicy::new(5));
//! let session = connector
//!     .connect_resolving(
//!         || discoverer.discover(),
//!         |address| async move { WsSession::connect(&address).await },
//!     )
//!     .await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future::{Future, ready};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::classify::{is_stale_endpoint, is_transient};
use super::duration_ms;
use super::policy::RetryPolicy;
use super::timeout::with_timeout;

// ============================================================================
// RetryingConnector
// ============================================================================

/// Connects with bounded retries and jittered exponential backoff.
///
/// Attempts are strictly sequential: attempt N+1 starts only after attempt
/// N failed and its backoff sleep completed.
#[derive(Debug, Clone, Default)]
pub struct RetryingConnector {
    policy: RetryPolicy,
}

impl RetryingConnector {
    /// Creates a connector with the given policy.
    #[inline]
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Returns the retry policy.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Connects to a fixed endpoint, reusing it on every attempt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectFailed`] wrapping the last error once a fatal
    /// error occurs or the attempts are exhausted.
    pub async fn connect<S, C, Fut>(&self, endpoint: &str, connect: C) -> Result<S>
    where
        C: FnMut(String) -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        let endpoint = endpoint.to_string();
        self.run(|| ready(Ok(endpoint.clone())), connect).await
    }

    /// Connects, re-resolving the endpoint before every attempt.
    ///
    /// Use this when the address may rotate between attempts, for example
    /// after the remote process restarted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectFailed`] wrapping the last error once a fatal
    /// error occurs or the attempts are exhausted. A resolver failure goes
    /// through the same classification as a connect failure.
    pub async fn connect_resolving<S, R, RFut, C, CFut>(&self, resolve: R, connect: C) -> Result<S>
    where
        R: FnMut() -> RFut,
        RFut: Future<Output = Result<String>>,
        C: FnMut(String) -> CFut,
        CFut: Future<Output = Result<S>>,
    {
        self.run(resolve, connect).await
    }

    async fn run<S, R, RFut, C, CFut>(&self, mut resolve: R, mut connect: C) -> Result<S>
    where
        R: FnMut() -> RFut,
        RFut: Future<Output = Result<String>>,
        C: FnMut(String) -> CFut,
        CFut: Future<Output = Result<S>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut last_address: Option<String> = None;
        let mut attempt: u32 = 0;

        loop {
            let outcome = match resolve().await {
                Ok(address) => {
                    debug!(attempt = attempt + 1, max_attempts, %address, "Connecting");
                    last_address = Some(address.clone());
                    with_timeout(
                        connect(address),
                        self.policy.per_attempt_timeout(),
                        "connect",
                    )
                    .await
                }
                Err(e) => Err(e),
            };

            let err = match outcome {
                Ok(session) => {
                    if attempt > 0 {
                        info!(attempts = attempt + 1, "Connected after retries");
                    }
                    return Ok(session);
                }
                Err(e) => e,
            };

            let attempts = attempt + 1;
            let retryable = is_transient(&err) || is_stale_endpoint(&err);

            if !retryable || attempts >= max_attempts {
                warn!(
                    attempts,
                    retryable,
                    address = last_address.as_deref().unwrap_or("<unresolved>"),
                    error = %err,
                    "Giving up on connect"
                );
                return Err(Error::connect_failed(attempts, last_address, err));
            }

            let delay = self.policy.backoff().delay_for_attempt(attempt);
            debug!(
                attempt = attempts,
                delay_ms = duration_ms(delay),
                error = %err,
                "Transient connect failure, backing off"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
