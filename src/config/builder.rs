//! Builder pattern for target configuration.
//!
//! Collects host/port or a base URL from code, the process environment or
//! any other key lookup, then produces a validated [`ConnectionTarget`].
//!
//! # Example
//!
//! ```no_run
//! use devtools_reconnect::TargetBuilder;
//!
//! # fn example() -> devtools_reconnect::Result<()> {
//! let target = TargetBuilder::from_env().port(9222).build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

use super::target::{ConnectionTarget, DEFAULT_HOST, parse_port};

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding a base URL (`http://host:port`).
pub const ENV_URL: &str = "DEVTOOLS_URL";

/// Environment variable holding the host.
pub const ENV_HOST: &str = "DEVTOOLS_HOST";

/// Environment variable holding the port.
pub const ENV_PORT: &str = "DEVTOOLS_PORT";

// ============================================================================
// TargetBuilder
// ============================================================================

/// Builder for a [`ConnectionTarget`].
///
/// A base URL, when present, wins over host and port.
#[derive(Debug, Default, Clone)]
pub struct TargetBuilder {
    /// Host name or address.
    host: Option<String>,
    /// Raw port, validated in [`build`](Self::build).
    port: Option<String>,
    /// Base URL form.
    base_url: Option<String>,
}

// ============================================================================
// TargetBuilder Implementation
// ============================================================================

impl TargetBuilder {
    /// Creates an empty builder.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder seeded from `DEVTOOLS_URL`, `DEVTOOLS_HOST` and
    /// `DEVTOOLS_PORT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a builder seeded from an arbitrary key lookup.
    ///
    /// Blank values are ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: get(ENV_HOST),
            port: get(ENV_PORT),
            base_url: get(ENV_URL),
        }
    }

    /// Sets the host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port.to_string());
        self
    }

    /// Sets the port from unvalidated text.
    #[inline]
    #[must_use]
    pub fn port_str(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Sets a base URL such as `http://127.0.0.1:9222`.
    #[inline]
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Validates the configuration and builds the target.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if neither a port nor a base URL is set
    /// - [`Error::Config`] if the port or URL is invalid
    pub fn build(self) -> Result<ConnectionTarget> {
        if let Some(url) = self.base_url {
            return ConnectionTarget::from_url(&url);
        }

        let port = self.port.ok_or_else(|| {
            Error::config(format!(
                "Remote debugging port is required. Use .port() or set {ENV_PORT}.\n\
                 Example: TargetBuilder::new().port(9222)"
            ))
        })?;
        let port = parse_port(&port)?;
        let host = self.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

        ConnectionTarget::new(host, i64::from(port))
    }
}

// ============================================================================
// Tests
// ============================================================================
