//! Error types for the DevTools reconnect layer.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use devtools_reconnect::{Driver, Result};
//!
//! async fn example(driver: &Driver) -> Result<()> {
//!     let session = driver.session().await?;
//!     session.send("Browser.getVersion", serde_json::json!({})).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Readiness | [`Error::PortNotReady`], [`Error::DiscoveryTimeout`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::HttpStatus`] |
//! | Protocol | [`Error::Protocol`], [`Error::Remote`] |
//! | Retry budget | [`Error::ConnectFailed`], [`Error::OperationFailed`] |
//! | Execution | [`Error::Timeout`], [`Error::RequestTimeout`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] |
//!
//! Whether an error is worth retrying is decided by
//! [`crate::resilience::is_transient`], also reachable as [`Error::is_transient`].

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging. Wrapping variants
/// keep the original error reachable through [`std::error::Error::source`].
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a target or policy is invalid. Never retried.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Readiness Errors
    // ========================================================================
    /// The remote port never accepted a TCP connection within the budget.
    #[error("Port {target} not ready after {timeout_ms}ms")]
    PortNotReady {
        /// `host:port` that was polled.
        target: String,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
        /// Last connect failure observed.
        #[source]
        source: Option<Box<Error>>,
    },

    /// The metadata endpoint never produced a control-channel address.
    #[error("Endpoint discovery on {target} timed out after {timeout_ms}ms")]
    DiscoveryTimeout {
        /// `host:port` that was queried.
        target: String,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
        /// Last discovery failure observed.
        #[source]
        source: Option<Box<Error>>,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Control channel closed unexpectedly.
    ///
    /// Returned when the connection is lost during an operation.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Metadata endpoint answered with an error status.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or malformed response.
    ///
    /// Returned when a discovery response or channel message has an
    /// unexpected shape. Never retried.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Error reported by the remote end or by a caller-supplied capability.
    ///
    /// Classified by message: "Target closed" style messages are transient,
    /// anything else is fatal.
    #[error("{message}")]
    Remote {
        /// Message as reported.
        message: String,
    },

    // ========================================================================
    // Retry Budget Errors
    // ========================================================================
    /// Connection establishment gave up.
    #[error("Failed to connect after {attempts} attempt(s){}", fmt_address(.address))]
    ConnectFailed {
        /// Number of connect attempts made.
        attempts: u32,
        /// Last address that was attempted, if any was resolved.
        address: Option<String>,
        /// Error of the final attempt.
        #[source]
        source: Box<Error>,
    },

    /// An operation kept failing across reconnects.
    #[error("Operation failed after {reconnects} reconnect(s)")]
    OperationFailed {
        /// Number of reconnects consumed.
        reconnects: u32,
        /// Error of the final attempt.
        #[source]
        source: Box<Error>,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation timeout.
    ///
    /// Returned when an operation exceeds its deadline.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Channel request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Failure of a connect attempt observed by more than one waiter.
    #[error(transparent)]
    Shared(Arc<Error>),

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

fn fmt_address(address: &Option<String>) -> String {
    match address {
        Some(address) => format!(" (last address: {address})"),
        None => String::new(),
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a remote error from a plain message.
    #[inline]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a port-not-ready error.
    #[inline]
    pub fn port_not_ready(target: impl Into<String>, timeout_ms: u64, last: Option<Error>) -> Self {
        Self::PortNotReady {
            target: target.into(),
            timeout_ms,
            source: last.map(Box::new),
        }
    }

    /// Creates a discovery timeout error.
    #[inline]
    pub fn discovery_timeout(
        target: impl Into<String>,
        timeout_ms: u64,
        last: Option<Error>,
    ) -> Self {
        Self::DiscoveryTimeout {
            target: target.into(),
            timeout_ms,
            source: last.map(Box::new),
        }
    }

    /// Creates a connect-failed error.
    #[inline]
    pub fn connect_failed(attempts: u32, address: Option<String>, last: Error) -> Self {
        Self::ConnectFailed {
            attempts,
            address,
            source: Box::new(last),
        }
    }

    /// Creates an operation-failed error.
    #[inline]
    pub fn operation_failed(reconnects: u32, last: Error) -> Self {
        Self::OperationFailed {
            reconnects,
            source: Box::new(last),
        }
    }

    /// Recovers an owned error from one observed by several waiters.
    ///
    /// Unwraps when this is the last reference, otherwise keeps it shared.
    #[must_use]
    pub fn from_shared(shared: Arc<Error>) -> Self {
        Arc::try_unwrap(shared).unwrap_or_else(Self::Shared)
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::RequestTimeout { .. } => true,
            Self::Shared(inner) => inner.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::Config { .. } => true,
            Self::Shared(inner) => inner.is_config_error(),
            _ => false,
        }
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection { .. }
            | Self::ConnectionClosed
            | Self::HttpStatus { .. }
            | Self::WebSocket(_)
            | Self::Http(_) => true,
            Self::Shared(inner) => inner.is_connection_error(),
            _ => false,
        }
    }

    /// Returns `true` if retrying the same operation may succeed.
    ///
    /// See [`crate::resilience::is_transient`].
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        crate::resilience::is_transient(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
