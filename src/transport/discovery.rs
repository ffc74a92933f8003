//! Control-channel address discovery.
//!
//! The remote publishes the current control-channel address on an HTTP
//! metadata endpoint. The address changes across remote restarts, so it is
//! fetched again whenever a connection is (re)established.
//!
//! # Flow
//!
//! 1. Wait for the TCP port with the full budget ([`wait_for_port_open`])
//! 2. `GET /json/version` until the remaining budget runs out
//! 3. Return `webSocketDebuggerUrl` (or legacy `wsEndpoint`)
//!
//! Network errors and HTTP error statuses are retried here. A body that is
//! not JSON, or JSON without a usable address, fails immediately.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::ConnectionTarget;
use crate::error::{Error, Result};
use crate::resilience::{duration_ms, is_transient};

use super::port::wait_for_port_open;

// ============================================================================
// Constants
// ============================================================================

/// Well-known metadata path.
pub const METADATA_PATH: &str = "/json/version";

/// Address fields accepted in the metadata document, in order of preference.
const ADDRESS_FIELDS: [&str; 2] = ["webSocketDebuggerUrl", "wsEndpoint"];

/// Default total discovery budget.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// EndpointDiscoverer
// ============================================================================

/// Reusable endpoint discoverer bound to one target.
///
/// Holds a shared HTTP client so repeated discoveries reuse connections.
///
/// # Example
///
/// ```ignore
/// use devtools_reconnect::{ConnectionTarget, EndpointDiscoverer};
///
/// let discoverer = EndpointDiscoverer::new(ConnectionTarget::localhost(9222)?)
///     .with_timeout(Duration::from_secs(10));
/// let address = discoverer.discover().await?;
/// ```
#[derive(Debug, Clone)]
pub struct EndpointDiscoverer {
    target: ConnectionTarget,
    timeout: Duration,
    poll_interval: Duration,
    client: Client,
}

impl EndpointDiscoverer {
    /// Creates a discoverer with default budget and poll interval.
    #[must_use]
    pub fn new(target: ConnectionTarget) -> Self {
        Self {
            target,
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            client: Client::new(),
        }
    }

    /// Sets the total budget, shared by port polling and metadata polling.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the delay between polls.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Uses a caller-provided HTTP client.
    #[inline]
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Returns the target.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Returns the total budget.
    #[inline]
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the poll interval.
    #[inline]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the metadata URL.
    #[must_use]
    pub fn metadata_url(&self) -> String {
        self.target.http_url(METADATA_PATH)
    }

    /// Discovers the current control-channel address.
    ///
    /// # Errors
    ///
    /// - [`Error::PortNotReady`] if the port never opened
    /// - [`Error::Protocol`] if the metadata response is malformed
    /// - [`Error::DiscoveryTimeout`] if the budget ran out while retrying
    pub async fn discover(&self) -> Result<String> {
        let started = Instant::now();
        wait_for_port_open(&self.target, self.timeout, self.poll_interval).await?;
        self.poll_metadata(started).await
    }

    /// Polls the metadata endpoint until the budget that began at `started`
    /// is spent.
    async fn poll_metadata(&self, started: Instant) -> Result<String> {
        let url = self.metadata_url();
        let mut attempts: u32 = 0;
        let mut last_error = None;

        loop {
            let remaining = self.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                debug!(endpoint = %self.target, attempts, "Discovery budget exhausted");
                return Err(self.budget_exhausted(last_error));
            }
            attempts += 1;

            match self.fetch_address(&url, remaining).await {
                Ok(address) => {
                    debug!(endpoint = %self.target, %address, attempts, "Discovered endpoint");
                    return Ok(address);
                }
                Err(e) if !is_retryable(&e) => {
                    warn!(endpoint = %self.target, error = %e, "Malformed metadata response");
                    return Err(e);
                }
                Err(e) => {
                    trace!(
                        endpoint = %self.target,
                        attempts,
                        error = %e,
                        "Metadata not available yet"
                    );

                    if started.elapsed() + self.poll_interval >= self.timeout {
                        debug!(endpoint = %self.target, attempts, "Discovery budget exhausted");
                        return Err(self.budget_exhausted(Some(e)));
                    }
                    last_error = Some(e);
                }
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Performs one metadata request bounded by `remaining`.
    async fn fetch_address(&self, url: &str, remaining: Duration) -> Result<String> {
        let response = self.client.get(url).timeout(remaining).send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        parse_address(&body)
    }

    fn budget_exhausted(&self, last_error: Option<Error>) -> Error {
        Error::discovery_timeout(self.target.to_string(), duration_ms(self.timeout), last_error)
    }
}

// ============================================================================
// Free Functions
// ============================================================================

/// Discovers the control-channel address of `target`.
///
/// One-shot form of [`EndpointDiscoverer::discover`].
///
/// # Errors
///
/// See [`EndpointDiscoverer::discover`].
pub async fn discover_endpoint(
    target: &ConnectionTarget,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String> {
    EndpointDiscoverer::new(target.clone())
        .with_timeout(timeout)
        .with_poll_interval(poll_interval)
        .discover()
        .await
}

/// Extracts the control-channel address from a metadata body.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the body is not JSON or has no field
/// holding a `ws://` or `wss://` URL.
pub fn parse_address(body: &str) -> Result<String> {
    let document: Value = serde_json::from_str(body)
        .map_err(|e| Error::protocol(format!("Metadata response is not JSON: {e}")))?;

    ADDRESS_FIELDS
        .iter()
        .filter_map(|field| document.get(field).and_then(Value::as_str))
        .find(|candidate| is_channel_address(candidate))
        .map(str::to_string)
        .ok_or_else(|| {
            Error::protocol(format!(
                "Metadata response has no control-channel address ({})",
                ADDRESS_FIELDS.join(" or ")
            ))
        })
}

/// Returns `true` for a non-empty `ws://` or `wss://` URL.
fn is_channel_address(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "ws" | "wss") && url.has_host())
        .unwrap_or(false)
}

/// Failures worth polling again at this layer.
///
/// Error statuses are retried here even though they are fatal to the
/// generic classifier: the endpoint answers 5xx/404 while still starting.
fn is_retryable(error: &Error) -> bool {
    matches!(error, Error::Http(_) | Error::HttpStatus { .. }) || is_transient(error)
}

// ============================================================================
// Tests
// ============================================================================
