//! Builder pattern for driver configuration.
//!
//! Provides a fluent API for configuring and creating [`Driver`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use devtools_reconnect::{Driver, RetryPolicy};
//!
//! # fn example() -> devtools_reconnect::Result<()> {
//! let driver = Driver::builder()
//!     .port(9222)
//!     .retry_policy(RetryPolicy::new(5).with_base_delay(Duration::from_millis(100)))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::config::{ConnectionTarget, TargetBuilder};
use crate::error::Result;
use crate::resilience::{ReconnectPolicy, RetryPolicy};
use crate::transport::DEFAULT_REQUEST_TIMEOUT;

use super::core::{Driver, DriverConfig};
use super::options::DiscoveryOptions;

// ============================================================================
// DriverBuilder
// ============================================================================

/// Builder for configuring a [`Driver`] instance.
///
/// Use [`Driver::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct DriverBuilder {
    /// Target pieces, validated at build time.
    target: TargetBuilder,
    /// Already validated target, wins over `target`.
    resolved: Option<ConnectionTarget>,
    /// Discovery budget.
    discovery: DiscoveryOptions,
    /// Connection establishment policy.
    retry: RetryPolicy,
    /// Operation reconnect policy.
    reconnect: ReconnectPolicy,
    /// Per-request timeout of the WebSocket session.
    request_timeout: Duration,
}

impl Default for DriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// DriverBuilder Implementation
// ============================================================================

impl DriverBuilder {
    /// Creates a new driver builder with default policies and no target.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_target_builder(TargetBuilder::new())
    }

    /// Creates a builder whose target is read from the environment.
    ///
    /// See [`TargetBuilder::from_env`].
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_target_builder(TargetBuilder::from_env())
    }

    fn with_target_builder(target: TargetBuilder) -> Self {
        Self {
            target,
            resolved: None,
            discovery: DiscoveryOptions::default(),
            retry: RetryPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Uses an already validated target.
    #[inline]
    #[must_use]
    pub fn target(mut self, target: ConnectionTarget) -> Self {
        self.resolved = Some(target);
        self
    }

    /// Sets the target host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.target = self.target.host(host);
        self
    }

    /// Sets the target port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.target = self.target.port(port);
        self
    }

    /// Sets the target from a base URL such as `http://127.0.0.1:9222`.
    #[inline]
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.target = self.target.base_url(url);
        self
    }

    /// Sets the discovery budget.
    #[inline]
    #[must_use]
    pub fn discovery(mut self, options: DiscoveryOptions) -> Self {
        self.discovery = options;
        self
    }

    /// Sets the connection establishment policy.
    #[inline]
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Sets the operation reconnect policy.
    #[inline]
    #[must_use]
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Sets the per-request timeout of sessions.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builds the driver with validation.
    ///
    /// No I/O happens here; the first session is opened lazily.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the target is
    /// missing or invalid.
    pub fn build(self) -> Result<Driver> {
        let target = match self.resolved {
            Some(target) => target,
            None => self.target.build()?,
        };

        Ok(Driver::new(DriverConfig {
            target,
            discovery: self.discovery,
            retry: self.retry,
            reconnect: self.reconnect,
            request_timeout: self.request_timeout,
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
