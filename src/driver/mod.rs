//! DevTools driver module.
//!
//! This module provides the main entry point: a ready-wired connection to
//! one remote debugging endpoint.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Driver`] | Cached session with discovery, retries and reconnects |
//! | [`DriverBuilder`] | Fluent configuration builder |
//! | [`DiscoveryOptions`] | Discovery budget and poll interval |
//!
//! # Example
//!
//! ```no_run
//! use devtools_reconnect::{Driver, Result};
//! use serde_json::json;
//!
//! # async fn example() -> Result<()> {
//! let driver = Driver::builder()
//!     .base_url("http://127.0.0.1:9222")
//!     .build()?;
//!
//! let targets = driver.call("Target.getTargets", json!({})).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for driver configuration.
pub mod builder;

/// Core driver implementation.
pub mod core;

/// Discovery options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::DriverBuilder;
pub use self::core::Driver;
pub use options::DiscoveryOptions;
