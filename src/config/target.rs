//! Remote endpoint addressing.
//!
//! A [`ConnectionTarget`] is validated once at construction; every later
//! component can rely on the port being in `1..=65535`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Host used when the caller does not specify one.
pub const DEFAULT_HOST: &str = "127.0.0.1";

// ============================================================================
// Port Validation
// ============================================================================

/// Validates an integer port number.
///
/// # Errors
///
/// Returns [`Error::Config`] unless `1 <= port <= 65535`.
pub fn validate_port(port: i64) -> Result<u16> {
    match u16::try_from(port) {
        Ok(0) | Err(_) => Err(Error::config(format!(
            "Invalid port {port}: expected an integer in 1..=65535"
        ))),
        Ok(port) => Ok(port),
    }
}

/// Parses and validates a port given as text (environment, CLI flag).
///
/// # Errors
///
/// Returns [`Error::Config`] for non-integers and out-of-range values.
pub fn parse_port(value: &str) -> Result<u16> {
    let trimmed = value.trim();
    let port = trimmed.parse::<i64>().map_err(|_| {
        Error::config(format!(
            "Invalid port {trimmed:?}: expected an integer in 1..=65535"
        ))
    })?;
    validate_port(port)
}

// ============================================================================
// ConnectionTarget
// ============================================================================

/// Host and port of the remote automation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionTarget {
    host: String,
    port: u16,
}

impl ConnectionTarget {
    /// Creates a target, validating the port.
    ///
    /// An empty host falls back to [`DEFAULT_HOST`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the port is out of range.
    pub fn new(host: impl Into<String>, port: i64) -> Result<Self> {
        let host = host.into();
        let host = if host.trim().is_empty() {
            DEFAULT_HOST.to_string()
        } else {
            host
        };

        Ok(Self {
            host,
            port: validate_port(port)?,
        })
    }

    /// Creates a target on the loopback interface.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the port is out of range.
    #[inline]
    pub fn localhost(port: i64) -> Result<Self> {
        Self::new(DEFAULT_HOST, port)
    }

    /// Parses a base URL such as `http://127.0.0.1:9222`.
    ///
    /// The scheme's default port is used when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is malformed or has no usable port.
    pub fn from_url(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url.trim())
            .map_err(|e| Error::config(format!("Invalid base URL {base_url:?}: {e}")))?;

        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .unwrap_or_default();

        let port = url.port_or_known_default().ok_or_else(|| {
            Error::config(format!("Base URL {base_url:?} does not specify a port"))
        })?;

        Self::new(host, i64::from(port))
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[inline]
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the HTTP base URL of the metadata endpoint.
    #[must_use]
    pub fn http_url(&self, path: &str) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{}{}", self.host, self.port, path)
        } else {
            format!("http://{}:{}{}", self.host, self.port, path)
        }
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
