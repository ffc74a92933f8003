//! Transient-vs-fatal error classification.
//!
//! Retry loops in this crate consult [`is_transient`] before spending any
//! budget. Anything not positively recognised as transient is fatal, so a
//! bad address or bad credentials fail once instead of retrying forever.
//!
//! # Transient Conditions
//!
//! | Source | Recognised as transient |
//! |--------|-------------------------|
//! | I/O | refused, reset, aborted, broken pipe, timed out, name resolution |
//! | HTTP client | connect and timeout failures |
//! | WebSocket | closed, already closed, reset without closing handshake |
//! | Messages | socket hang up, WebSocket not open/closed, Target closed |
//! | Crate | [`Error::ConnectionClosed`], [`Error::Timeout`], [`Error::RequestTimeout`] |

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::io::{Error as IoError, ErrorKind};
use std::sync::LazyLock;

use regex::Regex;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::error::ProtocolError;

use crate::error::Error;

// ============================================================================
// Patterns
// ============================================================================

/// Messages meaning the remote side went away or is not reachable yet.
static TRANSIENT_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)socket hang up|websocket is not open|websocket (?:is |was )?closed|target closed|failed to lookup address|name or service not known|temporary failure in name resolution|nodename nor servname|\b(?:ECONNREFUSED|ECONNRESET|EPIPE|ETIMEDOUT|ENOTFOUND|EAI_AGAIN)\b",
    )
    .expect("transient message pattern is valid")
});

/// Messages meaning the remote answered a handshake with something other
/// than an upgrade, usually because the address went stale.
static STALE_ENDPOINT_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)unexpected (?:server )?response")
        .expect("stale endpoint pattern is valid")
});

// ============================================================================
// Classification
// ============================================================================

/// Returns `true` if retrying after a delay may succeed.
///
/// Pure and deterministic: the same error shape always yields the same
/// answer. Terminal wrappers ([`Error::ConnectFailed`],
/// [`Error::OperationFailed`], [`Error::PortNotReady`],
/// [`Error::DiscoveryTimeout`]) are never transient since their budget is
/// already spent.
#[must_use]
pub fn is_transient(error: &Error) -> bool {
    match error {
        Error::ConnectionClosed
        | Error::Timeout { .. }
        | Error::RequestTimeout { .. }
        | Error::ChannelClosed(_) => true,

        Error::Io(e) => io_is_transient(e),
        Error::WebSocket(e) => ws_is_transient(e),
        Error::Http(e) => e.is_connect() || e.is_timeout() || chain_is_transient(e),

        Error::Connection { message } | Error::Remote { message } | Error::Protocol { message } => {
            message_is_transient(message)
        }

        Error::Shared(inner) => is_transient(inner),

        Error::Config { .. }
        | Error::PortNotReady { .. }
        | Error::DiscoveryTimeout { .. }
        | Error::HttpStatus { .. }
        | Error::ConnectFailed { .. }
        | Error::OperationFailed { .. }
        | Error::Json(_) => false,
    }
}

/// Returns `true` if a connect attempt was answered with an unexpected
/// response instead of a channel upgrade.
///
/// A re-resolved address usually fixes this, so the retrying connector
/// treats it as transient on top of [`is_transient`].
#[must_use]
pub fn is_stale_endpoint(error: &Error) -> bool {
    match error {
        Error::WebSocket(WsError::Http(_)) => true,
        Error::Connection { message } | Error::Remote { message } | Error::Protocol { message } => {
            STALE_ENDPOINT_MESSAGE.is_match(message)
        }
        Error::Shared(inner) => is_stale_endpoint(inner),
        _ => false,
    }
}

/// Returns `true` if a message matches a known transient phrasing.
#[inline]
#[must_use]
pub fn message_is_transient(message: &str) -> bool {
    TRANSIENT_MESSAGE.is_match(message)
}

fn io_is_transient(error: &IoError) -> bool {
    matches!(
        error.kind(),
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::TimedOut
    ) || message_is_transient(&error.to_string())
}

fn ws_is_transient(error: &WsError) -> bool {
    match error {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(e) => io_is_transient(e),
        _ => false,
    }
}

/// Walks a source chain looking for a transient I/O failure.
fn chain_is_transient(error: &(dyn StdError + 'static)) -> bool {
    let mut current = error.source();
    while let Some(source) = current {
        if let Some(io) = source.downcast_ref::<IoError>()
            && io_is_transient(io)
        {
            return true;
        }
        current = source.source();
    }
    false
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tokio_tungstenite::tungstenite::error::UrlError;

    fn io(kind: ErrorKind) -> Error {
        Error::Io(IoError::from(kind))
    }

    #[test]
    fn test_socket_codes_are_transient() {
        for kind in [
            ErrorKind::ConnectionRefused,
            ErrorKind::ConnectionReset,
            ErrorKind::ConnectionAborted,
            ErrorKind::BrokenPipe,
            ErrorKind::TimedOut,
        ] {
            assert!(is_transient(&io(kind)), "{kind:?} should be transient");
        }
    }

    #[test]
    fn test_name_resolution_failures_are_transient() {
        let permanent =
            IoError::other("failed to lookup address information: Name or service not known");
        let temporary = IoError::other("Temporary failure in name resolution");
        assert!(is_transient(&Error::Io(permanent)));
        assert!(is_transient(&Error::Io(temporary)));
    }

    #[test]
    fn test_other_io_errors_are_fatal() {
        assert!(!is_transient(&io(ErrorKind::PermissionDenied)));
        assert!(!is_transient(&io(ErrorKind::NotFound)));
    }

    #[test]
    fn test_closed_channel_messages_are_transient() {
        for message in [
            "socket hang up",
            "WebSocket is not open: readyState 3 (CLOSED)",
            "WebSocket was closed before the connection was established",
            "Target closed",
            "Protocol error (Runtime.evaluate): Target closed.",
            "connect ECONNREFUSED 127.0.0.1:9222",
            "getaddrinfo EAI_AGAIN devtools.local",
        ] {
            assert!(
                is_transient(&Error::remote(message)),
                "{message:?} should be transient"
            );
        }
    }

    #[test]
    fn test_unrelated_messages_are_fatal() {
        for message in ["bad credentials", "403 Forbidden", "unexpected token < in JSON", ""] {
            assert!(
                !is_transient(&Error::remote(message)),
                "{message:?} should be fatal"
            );
        }
    }

    #[test]
    fn test_crate_variants() {
        assert!(is_transient(&Error::ConnectionClosed));
        assert!(is_transient(&Error::timeout("connect", 100)));
        assert!(!is_transient(&Error::config("bad port")));
        assert!(!is_transient(&Error::protocol("metadata response missing address")));
        assert!(!is_transient(&Error::HttpStatus {
            status: 503,
            url: "http://127.0.0.1:9222/json/version".into(),
        }));
    }

    #[test]
    fn test_terminal_wrappers_are_fatal() {
        let refused = || io(ErrorKind::ConnectionRefused);
        assert!(!is_transient(&Error::connect_failed(3, None, refused())));
        assert!(!is_transient(&Error::operation_failed(2, refused())));
        assert!(!is_transient(&Error::port_not_ready("127.0.0.1:1", 10, Some(refused()))));
        assert!(!is_transient(&Error::discovery_timeout("127.0.0.1:1", 10, Some(refused()))));
    }

    #[test]
    fn test_websocket_errors() {
        assert!(is_transient(&Error::WebSocket(WsError::ConnectionClosed)));
        assert!(is_transient(&Error::WebSocket(WsError::AlreadyClosed)));
        assert!(is_transient(&Error::WebSocket(WsError::Io(IoError::from(
            ErrorKind::ConnectionReset
        )))));
        assert!(!is_transient(&Error::WebSocket(WsError::Url(UrlError::NoHostName))));
    }

    #[test]
    fn test_shared_error_classifies_as_inner() {
        let transient = Error::Shared(Arc::new(Error::ConnectionClosed));
        let fatal = Error::Shared(Arc::new(Error::remote("bad credentials")));
        assert!(is_transient(&transient));
        assert!(!is_transient(&fatal));
    }

    #[test]
    fn test_stale_endpoint() {
        assert!(is_stale_endpoint(&Error::remote("Unexpected server response: 404")));
        assert!(is_stale_endpoint(&Error::connection("unexpected response from remote")));
        assert!(!is_stale_endpoint(&Error::remote("Target closed")));
        assert!(!is_transient(&Error::remote("Unexpected server response: 404")));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let err = Error::remote("socket hang up");
        let first = is_transient(&err);
        for _ in 0..10 {
            assert_eq!(is_transient(&err), first);
        }
    }
}
