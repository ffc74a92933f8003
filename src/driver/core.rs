//! DevTools driver coordinator.
//!
//! The [`Driver`] wires the resilience core to the default transport:
//!
//! ```text
//! Driver ─► ReconnectManager ─► RetryingConnector ─┬─► EndpointDiscoverer (per attempt)
//!                                                  └─► WsSession::connect
//! ```
//!
//! # Example
//!
//! ```no_run
//! use devtools_reconnect::Driver;
//! use serde_json::json;
//!
//! # async fn example() -> devtools_reconnect::Result<()> {
//! let driver = Driver::builder().port(9222).build()?;
//!
//! let version = driver.call("Browser.getVersion", json!({})).await?;
//! println!("{version}");
//!
//! driver.close();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::info;

use crate::config::ConnectionTarget;
use crate::error::{Error, Result};
use crate::resilience::{
    ManagerState, ReconnectManager, ReconnectPolicy, RetryPolicy, RetryingConnector,
};
use crate::transport::{EndpointDiscoverer, WsSession};

use super::builder::DriverBuilder;
use super::options::DiscoveryOptions;

// ============================================================================
// Types
// ============================================================================

/// Validated settings handed over by [`DriverBuilder`].
pub(crate) struct DriverConfig {
    pub target: ConnectionTarget,
    pub discovery: DiscoveryOptions,
    pub retry: RetryPolicy,
    pub reconnect: ReconnectPolicy,
    pub request_timeout: Duration,
}

/// Internal shared state for the driver.
pub(crate) struct DriverInner {
    /// Remote endpoint.
    target: ConnectionTarget,

    /// Discoverer shared with the connect capability.
    discoverer: EndpointDiscoverer,

    /// Cached session and reconnection.
    manager: ReconnectManager<WsSession>,
}

// ============================================================================
// Driver
// ============================================================================

/// DevTools connection coordinator.
///
/// The driver is responsible for:
/// - Discovering the current control-channel address
/// - Establishing sessions with bounded retries
/// - Re-running operations across transient disconnects
///
/// Cloning is cheap; clones share one cached session.
#[derive(Clone)]
pub struct Driver {
    /// Shared inner state.
    pub(crate) inner: Arc<DriverInner>,
}

// ============================================================================
// Driver - Display
// ============================================================================

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("target", &self.inner.target)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Driver - Public API
// ============================================================================

impl Driver {
    /// Creates a configuration builder for the driver.
    #[inline]
    #[must_use]
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Returns the remote endpoint.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &ConnectionTarget {
        &self.inner.target
    }

    /// Returns the state of the cached session.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ManagerState {
        self.inner.manager.state()
    }

    /// Discovers the current control-channel address without connecting.
    ///
    /// # Errors
    ///
    /// See [`EndpointDiscoverer::discover`].
    pub async fn discover(&self) -> Result<String> {
        self.inner.discoverer.discover().await
    }

    /// Returns the cached session, connecting if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectFailed`](crate::Error::ConnectFailed) when
    /// establishing the session gave up.
    pub async fn session(&self) -> Result<Arc<WsSession>> {
        self.inner.manager.get_session().await
    }

    /// Runs `operation` against the session, reconnecting on transient failures.
    ///
    /// # Errors
    ///
    /// See [`ReconnectManager::with_operation`].
    pub async fn with_operation<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut(Arc<WsSession>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.inner.manager.with_operation(operation).await
    }

    /// Calls `method` on the remote, reconnecting on transient failures.
    ///
    /// # Errors
    ///
    /// See [`ReconnectManager::with_operation`].
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.with_operation(|session| {
            let params = params.clone();
            async move { session.call(method, params).await }
        })
        .await
    }

    /// Drops the cached session and abandons any attempt in flight.
    ///
    /// The driver stays usable; the next call connects again.
    pub fn close(&self) {
        info!(endpoint = %self.inner.target, "Closing driver session");
        self.inner.manager.disconnect();
    }
}

// ============================================================================
// Driver - Internal API
// ============================================================================

impl Driver {
    /// Creates a new driver instance. Performs no I/O.
    pub(crate) fn new(config: DriverConfig) -> Self {
        let discoverer = EndpointDiscoverer::new(config.target.clone())
            .with_timeout(config.discovery.timeout)
            .with_poll_interval(config.discovery.poll_interval);

        let connector = RetryingConnector::new(config.retry);
        let request_timeout = config.request_timeout;
        let resolver = discoverer.clone();

        let manager = ReconnectManager::new(
            move || {
                let discoverer = resolver.clone();
                let connector = connector.clone();
                async move {
                    connector
                        .connect_resolving(
                            || discoverer.discover(),
                            move |address| async move {
                                let session = WsSession::connect(&address).await?;
                                Ok::<_, Error>(session.with_request_timeout(request_timeout))
                            },
                        )
                        .await
                }
            },
            config.reconnect,
        );

        Self {
            inner: Arc::new(DriverInner {
                target: config.target,
                discoverer,
                manager,
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
