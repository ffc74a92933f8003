//! Transport layer: readiness, discovery and sessions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   TCP probe    ┌─────────────────────────┐
//! │  wait_for_port  │───────────────►│                         │
//! ├─────────────────┤   GET /json/   │   Remote process        │
//! │  discovery      │───────────────►│   (debugging port)      │
//! ├─────────────────┤   WebSocket    │                         │
//! │  WsSession      │◄──────────────►│                         │
//! └─────────────────┘                └─────────────────────────┘
//! ```
//!
//! The resilience core only sees the [`Session`] and [`Connect`] seams;
//! [`WsSession`] is one implementation of them.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `port` | TCP port readiness polling |
//! | `discovery` | Control-channel address discovery over HTTP |
//! | `session` | Capability traits for sessions and connectors |
//! | `connection` | WebSocket session and event loop |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket session and event loop.
pub mod connection;

/// Control-channel address discovery.
pub mod discovery;

/// TCP port readiness polling.
pub mod port;

/// Session and connect capabilities.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{DEFAULT_REQUEST_TIMEOUT, EventHandler, WsSession};
pub use discovery::{
    DEFAULT_DISCOVERY_TIMEOUT, DEFAULT_POLL_INTERVAL, EndpointDiscoverer, METADATA_PATH,
    discover_endpoint, parse_address,
};
pub use port::wait_for_port_open;
pub use session::{Connect, DisconnectObserver, Session};
