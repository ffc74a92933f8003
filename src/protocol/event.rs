//! Event message types.
//!
//! Events are notifications pushed by the remote end without a request id.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Event
// ============================================================================

/// An event notification from the remote end.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... },
///   "sessionId": "optional"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,

    /// Session the event belongs to, for flattened multiplexing.
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

impl Event {
    /// Returns the domain name from the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let event = Event { method: "Target.detachedFromTarget".into(), .. };
    /// assert_eq!(event.domain(), "Target");
    /// ```
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_parsing() {
        let event: Event = serde_json::from_str(
            r#"{"method": "Target.targetCrashed", "params": {"targetId": "T1"}}"#,
        )
        .expect("parse");

        assert_eq!(event.domain(), "Target");
        assert_eq!(event.event_name(), "targetCrashed");
        assert_eq!(event.params["targetId"], "T1");
        assert!(event.session_id.is_none());
    }

    #[test]
    fn test_event_without_params() {
        let event: Event =
            serde_json::from_str(r#"{"method": "Inspector.detached", "sessionId": "S"}"#)
                .expect("parse");

        assert!(event.params.is_null());
        assert_eq!(event.session_id.as_deref(), Some("S"));
    }

    #[test]
    fn test_event_requires_method() {
        let result = serde_json::from_str::<Event>(r#"{"id": 1, "result": {}}"#);
        assert!(result.is_err());
    }
}
