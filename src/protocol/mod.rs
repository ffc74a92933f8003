//! Control channel message types.
//!
//! This module defines the JSON messages exchanged by the default
//! WebSocket session. The resilience core never looks at them.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Remote | Command request |
//! | `Response` | Remote → Local | Command response |
//! | `Event` | Remote → Local | Notification without id |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Event type |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::Event;
pub use request::{RemoteError, Request, Response};
