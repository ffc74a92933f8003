//! Request and Response message types.
//!
//! Defines the JSON message format for command requests and responses on
//! the control channel.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

// ============================================================================
// Request
// ============================================================================

/// A command request sent over the control channel.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "Domain.methodName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Identifier for request/response correlation.
    pub id: RequestId,

    /// Method in `Domain.methodName` format.
    pub method: String,

    /// Method parameters.
    pub params: Value,

    /// Target session for flattened multiplexing.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
            session_id: None,
        }
    }

    /// Routes the request to an attached target session.
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response received over the control channel.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 1, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 1, "error": { "code": -32000, "message": "Target closed" } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error details (if error).
    #[serde(default)]
    pub error: Option<RemoteError>,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning an error if the remote reported one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] carrying the remote message, so that
    /// "Target closed" style failures classify as transient.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(error.into()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// RemoteError
// ============================================================================

/// Error object reported by the remote end.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    /// Numeric error code.
    #[serde(default)]
    pub code: i64,

    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

impl From<RemoteError> for Error {
    fn from(error: RemoteError) -> Self {
        if error.message.is_empty() {
            Error::remote(format!("Remote error {}", error.code))
        } else {
            Error::remote(error.message)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = Request::new(RequestId::new(1), "Browser.getVersion", json!({}));
        let json = serde_json::to_value(&request).expect("serialize");

        assert_eq!(json["id"], 1);
        assert_eq!(json["method"], "Browser.getVersion");
        assert!(json.get("sessionId").is_none());
    }

    #[test]
    fn test_request_with_session() {
        let params = json!({"url": "about:blank"});
        let request = Request::new(RequestId::new(2), "Page.navigate", params).with_session("ABCD");
        let json = serde_json::to_value(&request).expect("serialize");

        assert_eq!(json["sessionId"], "ABCD");
    }

    #[test]
    fn test_success_response() {
        let response: Response =
            serde_json::from_str(r#"{"id": 3, "result": {"product": "Chrome/120"}}"#)
                .expect("parse");

        assert!(!response.is_error());
        assert_eq!(response.into_result().unwrap()["product"], "Chrome/120");
    }

    #[test]
    fn test_into_result_error_is_remote() {
        let response: Response = serde_json::from_str(
            r#"{"id": 4, "error": {"code": -32000, "message": "Target closed"}}"#,
        )
        .expect("parse");

        assert!(response.is_error());
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, Error::Remote { ref message } if message == "Target closed"));
    }

    #[test]
    fn test_into_result_without_result_is_null() {
        let response: Response = serde_json::from_str(r#"{"id": 5}"#).expect("parse");
        assert_eq!(response.into_result().expect("success"), Value::Null);
    }

    #[test]
    fn test_remote_error_without_message() {
        let err: Error = RemoteError {
            code: -32601,
            message: String::new(),
        }
        .into();
        assert_eq!(err.to_string(), "Remote error -32601");
    }
}
