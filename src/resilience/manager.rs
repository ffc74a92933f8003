//! Cached session with transparent reconnection.
//!
//! A [`ReconnectManager`] owns at most one live session. Operations run
//! against it through [`ReconnectManager::with_operation`]; when an
//! operation fails transiently the session is discarded, a fresh one is
//! connected and the operation runs again.
//!
//! # State Machine
//!
//! ```text
//!                 get_session()              success
//! Disconnected ─────────────────► Connecting ─────────► Connected
//!      ▲                              │                     │
//!      │          failure             │                     │
//!      ├──────────────────────────────┘                     │
//!      │        remote disconnect / discard                 │
//!      └────────────────────────────────────────────────────┘
//! ```
//!
//! # Single Flight
//!
//! While `Connecting`, every caller awaits the same shared attempt and
//! observes its single result. The state lives behind one
//! `parking_lot::Mutex` that is never held across an `.await`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::result::Result as StdResult;
use std::sync::{Arc, Weak};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::SessionEpoch;
use crate::transport::session::{Connect, Session};

use super::classify::is_transient;
use super::duration_ms;
use super::policy::ReconnectPolicy;

// ============================================================================
// Types
// ============================================================================

/// Connect attempt shared by every caller waiting on it.
type PendingConnect<S> = Shared<BoxFuture<'static, StdResult<Arc<S>, Arc<Error>>>>;

// ============================================================================
// ManagerState
// ============================================================================

/// Observable state of a [`ReconnectManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// No cached session and no attempt in flight.
    Disconnected,
    /// One attempt in flight, no cached session.
    Connecting,
    /// A cached session, no attempt in flight.
    Connected,
}

// ============================================================================
// Slot
// ============================================================================

/// The manager's single mutable field.
///
/// Each variant carries exactly what its state owns, so the three states
/// cannot overlap.
enum Slot<S> {
    Disconnected,
    Connecting {
        pending: PendingConnect<S>,
        epoch: SessionEpoch,
    },
    Connected {
        session: Arc<S>,
        epoch: SessionEpoch,
    },
}

impl<S> Slot<S> {
    fn state(&self) -> ManagerState {
        match self {
            Self::Disconnected => ManagerState::Disconnected,
            Self::Connecting { .. } => ManagerState::Connecting,
            Self::Connected { .. } => ManagerState::Connected,
        }
    }
}

/// State shared with connect attempts and disconnect observers.
struct Shelf<S> {
    slot: Slot<S>,
    /// Last epoch handed out.
    epoch: SessionEpoch,
}

type SharedShelf<S> = Mutex<Shelf<S>>;

// ============================================================================
// ReconnectManager
// ============================================================================

/// Owns one long-lived session and re-establishes it on demand.
///
/// One manager per logical session; there is no global state.
///
/// # Example
///
/// ```ignore
/// use devtools_reconnect::{ReconnectManager, ReconnectPolicy};
///
/// let manager = ReconnectManager::new(
///     move || connect_somehow(),
///     ReconnectPolicy::new(3),
/// );
///
/// let version = manager
///     .with_operation(|session| async move {
///         session.send("Browser.getVersion", json!({})).await
///     })
///     .await?;
/// ```
pub struct ReconnectManager<S: Session> {
    /// Slot and epoch counter.
    shelf: Arc<SharedShelf<S>>,
    /// Caller-supplied session factory.
    connect: Arc<dyn Connect<S>>,
    /// Reconnect budget and backoff.
    policy: ReconnectPolicy,
}

impl<S: Session> fmt::Debug for ReconnectManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconnectManager")
            .field("state", &self.state())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ReconnectManager - Public API
// ============================================================================

impl<S: Session> ReconnectManager<S> {
    /// Creates a manager in the `Disconnected` state.
    ///
    /// No I/O happens until the first [`get_session`](Self::get_session).
    #[must_use]
    pub fn new(connect: impl Connect<S>, policy: ReconnectPolicy) -> Self {
        Self {
            shelf: Arc::new(Mutex::new(Shelf {
                slot: Slot::Disconnected,
                epoch: SessionEpoch::new(0),
            })),
            connect: Arc::new(connect),
            policy,
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ManagerState {
        self.shelf.lock().slot.state()
    }

    /// Returns the reconnect policy.
    #[inline]
    #[must_use]
    pub const fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Returns the cached session, connecting if needed.
    ///
    /// - `Connected`: returns the cached session, no I/O
    /// - `Connecting`: awaits the attempt already in flight
    /// - `Disconnected`: calls the connect capability exactly once
    ///
    /// # Errors
    ///
    /// Returns the connect failure unchanged (shared between concurrent
    /// waiters). The manager is back to `Disconnected` afterwards.
    pub async fn get_session(&self) -> Result<Arc<S>> {
        let pending = {
            let mut shelf = self.shelf.lock();
            match &shelf.slot {
                Slot::Connected { session, .. } => return Ok(Arc::clone(session)),
                Slot::Connecting { pending, .. } => pending.clone(),
                Slot::Disconnected => {
                    let epoch = shelf.epoch.next();
                    shelf.epoch = epoch;
                    let pending = self.start_connect(epoch);
                    shelf.slot = Slot::Connecting {
                        pending: pending.clone(),
                        epoch,
                    };
                    debug!(%epoch, "Connecting session");
                    pending
                }
            }
        };

        pending.await.map_err(Error::from_shared)
    }

    /// Runs `operation` against the session, reconnecting on transient failures.
    ///
    /// Fatal errors are returned unchanged without consuming a reconnect.
    /// Failures to obtain a session go through the same classification.
    ///
    /// # Errors
    ///
    /// - The first fatal error, unchanged
    /// - [`Error::OperationFailed`] once `max_reconnects` is spent
    pub async fn with_operation<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(Arc<S>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_reconnects = self.policy.max_reconnects();
        let mut reconnects: u32 = 0;

        loop {
            let (session, outcome) = match self.get_session().await {
                Ok(session) => {
                    let outcome = operation(Arc::clone(&session)).await;
                    (Some(session), outcome)
                }
                Err(e) => (None, Err(e)),
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !is_transient(&err) {
                debug!(error = %err, "Fatal operation error");
                return Err(err);
            }

            if reconnects >= max_reconnects {
                warn!(reconnects, error = %err, "Reconnect budget exhausted");
                return Err(Error::operation_failed(reconnects, err));
            }

            if let Some(session) = session {
                self.discard(&session);
            }

            let delay = self.policy.backoff().delay_for_attempt(reconnects);
            info!(
                reconnect = reconnects + 1,
                max_reconnects,
                delay_ms = duration_ms(delay),
                error = %err,
                "Transient failure, reconnecting"
            );
            sleep(delay).await;
            reconnects += 1;
        }
    }

    /// Drops the cached session, if any, with a best-effort disconnect.
    ///
    /// The next [`get_session`](Self::get_session) connects again. An
    /// attempt already in flight is left alone.
    pub fn invalidate(&self) {
        let cached = {
            let mut shelf = self.shelf.lock();
            match std::mem::replace(&mut shelf.slot, Slot::Disconnected) {
                Slot::Connected { session, epoch } => Some((session, epoch)),
                other => {
                    shelf.slot = other;
                    None
                }
            }
        };

        if let Some((session, epoch)) = cached {
            debug!(%epoch, "Invalidating cached session");
            session.disconnect();
        }
    }

    /// Drops the cached session or abandons the attempt in flight.
    ///
    /// A cached session is asked to disconnect. A session produced by an
    /// abandoned attempt is disconnected as soon as it arrives.
    pub fn disconnect(&self) {
        let previous = {
            let mut shelf = self.shelf.lock();
            std::mem::replace(&mut shelf.slot, Slot::Disconnected)
        };

        match previous {
            Slot::Connected { session, epoch } => {
                debug!(%epoch, "Disconnecting cached session");
                session.disconnect();
            }
            Slot::Connecting { epoch, .. } => {
                debug!(%epoch, "Abandoning connect attempt");
            }
            Slot::Disconnected => {}
        }
    }
}

// ============================================================================
// ReconnectManager - Internals
// ============================================================================

impl<S: Session> ReconnectManager<S> {
    /// Builds the shared attempt for `epoch`.
    ///
    /// The attempt itself performs the state transition, so it happens
    /// exactly once no matter which waiter drives it.
    fn start_connect(&self, epoch: SessionEpoch) -> PendingConnect<S> {
        let attempt = self.connect.connect();
        let shelf = Arc::downgrade(&self.shelf);

        async move {
            let result = attempt.await;
            settle(&shelf, epoch, result)
        }
        .boxed()
        .shared()
    }

    /// Discards `session` after a transient failure.
    ///
    /// The cached reference is only cleared if it is still this session.
    fn discard(&self, session: &Arc<S>) {
        {
            let mut shelf = self.shelf.lock();
            let cached = match &shelf.slot {
                Slot::Connected { session: cached, epoch } if Arc::ptr_eq(cached, session) => {
                    Some(*epoch)
                }
                _ => None,
            };
            if let Some(epoch) = cached {
                debug!(%epoch, "Discarding session");
                shelf.slot = Slot::Disconnected;
            }
        }

        session.disconnect();
    }
}

/// Completes attempt `epoch`: caches the session or resets the slot.
fn settle<S: Session>(
    shelf: &Weak<SharedShelf<S>>,
    epoch: SessionEpoch,
    result: Result<S>,
) -> StdResult<Arc<S>, Arc<Error>> {
    let Some(strong) = shelf.upgrade() else {
        return result.map(Arc::new).map_err(Arc::new);
    };

    match result {
        Ok(session) => {
            let session = Arc::new(session);
            let installed = {
                let mut guard = strong.lock();
                let installed = matches!(
                    guard.slot,
                    Slot::Connecting { epoch: current, .. } if current == epoch
                );
                if installed {
                    guard.slot = Slot::Connected {
                        session: Arc::clone(&session),
                        epoch,
                    };
                }
                installed
            };

            if !installed {
                debug!(%epoch, "Connect attempt was abandoned, dropping session");
                session.disconnect();
                return Err(Arc::new(Error::ConnectionClosed));
            }

            // Registered outside the lock: an already-closed session fires
            // the observer synchronously.
            let observer_shelf = Weak::clone(shelf);
            session.on_disconnect(Box::new(move || {
                if let Some(shelf) = observer_shelf.upgrade() {
                    let mut guard = shelf.lock();
                    let still_current = matches!(
                        guard.slot,
                        Slot::Connected { epoch: current, .. } if current == epoch
                    );
                    if still_current {
                        debug!(%epoch, "Session disconnected by remote");
                        guard.slot = Slot::Disconnected;
                    }
                }
            }));

            info!(%epoch, "Session connected");
            Ok(session)
        }
        Err(e) => {
            {
                let mut guard = strong.lock();
                let still_current = matches!(
                    guard.slot,
                    Slot::Connecting { epoch: current, .. } if current == epoch
                );
                if still_current {
                    guard.slot = Slot::Disconnected;
                }
            }
            debug!(%epoch, error = %e, "Connect attempt failed");
            Err(Arc::new(e))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
