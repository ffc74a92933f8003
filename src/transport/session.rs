//! Capability seams between the resilience core and a transport.
//!
//! The core never knows how a session talks to the remote end. It needs a
//! way to create one ([`Connect`]) and two affordances on the result
//! ([`Session`]).

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// Callback fired once when a session observes its own disconnection.
pub type DisconnectObserver = Box<dyn FnOnce() + Send + 'static>;

// ============================================================================
// Session
// ============================================================================

/// A live control-channel session.
///
/// Implementations must fire every registered observer at most once, and
/// must fire an observer immediately when it is registered after the
/// session already closed.
pub trait Session: Send + Sync + 'static {
    /// Registers a callback for when the session becomes disconnected.
    fn on_disconnect(&self, observer: DisconnectObserver);

    /// Requests disconnection. Best-effort and idempotent.
    fn disconnect(&self);
}

// ============================================================================
// Connect
// ============================================================================

/// Capability creating new sessions.
///
/// Implemented for any `Fn() -> impl Future<Output = Result<S>>` closure.
pub trait Connect<S>: Send + Sync + 'static {
    /// Starts one connection attempt.
    fn connect(&self) -> BoxFuture<'static, Result<S>>;
}

impl<S, F, Fut> Connect<S> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S>> + Send + 'static,
{
    fn connect(&self) -> BoxFuture<'static, Result<S>> {
        Box::pin(self())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn boxed<S>(connect: impl Connect<S>) -> Arc<dyn Connect<S>> {
        Arc::new(connect)
    }

    #[tokio::test]
    async fn test_closure_is_connect_capability() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let connect = boxed(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, crate::Error>(n) }
        });

        assert_eq!(connect.connect().await.unwrap(), 0);
        assert_eq!(connect.connect().await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
