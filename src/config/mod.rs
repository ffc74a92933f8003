//! Target configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionTarget`] | Validated host and port |
//! | [`TargetBuilder`] | Fluent builder, environment aware |
//!
//! # Example
//!
//! ```no_run
//! use devtools_reconnect::{ConnectionTarget, TargetBuilder};
//!
//! # fn example() -> devtools_reconnect::Result<()> {
//! let direct = ConnectionTarget::localhost(9222)?;
//! let from_url = ConnectionTarget::from_url("http://127.0.0.1:9222")?;
//! let from_env = TargetBuilder::from_env().build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for targets.
pub mod builder;

/// Validated host/port pair.
pub mod target;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ENV_HOST, ENV_PORT, ENV_URL, TargetBuilder};
pub use target::{ConnectionTarget, DEFAULT_HOST, parse_port, validate_port};
