//! DevTools Reconnect - Resilient connections to remote debugging endpoints.
//!
//! This library keeps a working control-channel session to a long-lived
//! remote automation endpoint (a browser exposing a DevTools-style
//! debugging port) that starts slowly, publishes a changing WebSocket
//! address, and may drop the channel at any time.
//!
//! # Architecture
//!
//! Components, leaves first:
//!
//! - **Classification**: [`is_transient`] decides between retrying and giving up
//! - **Timeouts**: [`with_timeout`] abandons operations past their deadline
//! - **Readiness**: [`wait_for_port_open`] polls the TCP port
//! - **Discovery**: [`EndpointDiscoverer`] reads the address from `/json/version`
//! - **Connection**: [`RetryingConnector`] retries with jittered exponential backoff
//! - **Reconnection**: [`ReconnectManager`] caches one session and re-runs operations
//!
//! Key design principles:
//!
//! - Transport is a capability ([`Connect`], [`Session`]), not a type hierarchy
//! - One manager per logical session, no global state
//! - Only positively recognised transient failures are retried
//!
//! # Quick Start
//!
//! ```no_run
//! use devtools_reconnect::{Driver, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let driver = Driver::builder().port(9222).build()?;
//!
//!     // Reconnects transparently if the channel drops mid-call
//!     let version = driver.call("Browser.getVersion", json!({})).await?;
//!     println!("Connected to: {}", version["product"]);
//!
//!     driver.close();
//!     Ok(())
//! }
//! ```
//!
//! # Bring Your Own Transport
//!
//! ```ignore
//! use devtools_reconnect::{ReconnectManager, ReconnectPolicy, RetryingConnector};
//!
//! let connector = RetryingConnector::default();
//! let manager = ReconnectManager::new(
//!     move || {
//!         let connector = connector.clone();
//!         async move { connector.connect(ADDRESS, |address| my_transport::open(address)).await }
//!     },
//!     ReconnectPolicy::default(),
//! );
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Target addressing and environment configuration |
//! | [`driver`] | Ready-wired driver and its builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Control-channel message types |
//! | [`resilience`] | Classification, timeouts, backoff, retries, reconnection |
//! | [`transport`] | Port readiness, discovery and WebSocket sessions |

// ============================================================================
// Modules
// ============================================================================

/// Target addressing and configuration.
pub mod config;

/// Driver factory and configuration.
///
/// Use [`Driver::builder()`] to create a configured driver instance.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Control-channel message types.
pub mod protocol;

/// Retry, timeout and reconnection primitives.
pub mod resilience;

/// Transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::{ConnectionTarget, TargetBuilder};

// Driver types
pub use driver::{DiscoveryOptions, Driver, DriverBuilder};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, SessionEpoch};

// Protocol types
pub use protocol::{Event, RemoteError, Request, Response};

// Resilience types
pub use resilience::{
    Backoff, FixedJitter, JitterSource, ManagerState, RandomJitter, ReconnectManager,
    ReconnectPolicy, RetryPolicy, RetryingConnector, is_stale_endpoint, is_transient,
    with_timeout,
};

// Transport types
pub use transport::{
    Connect, DisconnectObserver, EndpointDiscoverer, Session, WsSession, discover_endpoint,
    wait_for_port_open,
};
