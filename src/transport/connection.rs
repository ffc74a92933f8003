//! WebSocket session and event loop.
//!
//! This module handles the WebSocket control channel to the remote end,
//! including request/response correlation and event routing.
//!
//! # Event Loop
//!
//! The session spawns a tokio task that handles:
//!
//! - Incoming messages from the remote (responses, events)
//! - Outgoing requests from the Rust API
//! - Request/response correlation by numeric id
//! - Event handler callbacks
//!
//! When the loop exits for any reason, pending requests fail with
//! [`Error::ConnectionClosed`] and disconnect observers fire once.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, from_str, to_string};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, RequestIdGenerator};
use crate::protocol::{Event, Request, Response};
use crate::resilience::duration_ms;

use super::session::{DisconnectObserver, Session};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for request execution.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum pending requests before rejecting new ones.
const MAX_PENDING_REQUESTS: usize = 100;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type WsWriter = SplitSink<WsStream, Message>;

/// Waiting callers keyed by request id.
type CorrelationMap = FxHashMap<RequestId, oneshot::Sender<Result<Response>>>;

/// Event handler callback type.
///
/// Called for each id-less message received from the remote.
pub type EventHandler = Box<dyn Fn(Event) + Send + Sync>;

/// Internal commands for the event loop.
enum SessionCommand {
    /// Write an encoded request; its caller waits on `response_tx`.
    Send {
        id: RequestId,
        payload: String,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Forget a caller that gave up waiting.
    Abandon(RequestId),
    /// Close the channel.
    Shutdown,
}

// ============================================================================
// SessionState
// ============================================================================

/// State shared between the session handle and its event loop.
#[derive(Default)]
struct SessionState {
    pending: Mutex<CorrelationMap>,
    event_handler: Mutex<Option<EventHandler>>,
    closed: AtomicBool,
    observers: Mutex<Vec<DisconnectObserver>>,
}

impl SessionState {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Fails every waiting caller, marks the session closed, then fires
    /// each observer once.
    fn close(&self) {
        let waiting: Vec<_> = self.pending.lock().drain().map(|(_, tx)| tx).collect();
        if !waiting.is_empty() {
            debug!(count = waiting.len(), "Failing requests on closed channel");
        }
        for tx in waiting {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        let observers = {
            let mut observers = self.observers.lock();
            self.closed.store(true, Ordering::SeqCst);
            std::mem::take(&mut *observers)
        };
        for observer in observers {
            observer();
        }
    }

    fn register(&self, observer: DisconnectObserver) {
        {
            let mut observers = self.observers.lock();
            if !self.is_closed() {
                observers.push(observer);
                return;
            }
        }
        observer();
    }

    /// Routes one text frame to its waiting caller or the event handler.
    fn dispatch(&self, text: &str) {
        if let Ok(response) = from_str::<Response>(text) {
            match self.pending.lock().remove(&response.id) {
                Some(tx) => {
                    let _ = tx.send(Ok(response));
                }
                None => warn!(id = %response.id, "Response for unknown request"),
            }
            return;
        }

        match from_str::<Event>(text) {
            Ok(event) => {
                trace!(method = %event.method, "Event received");
                if let Some(handler) = self.event_handler.lock().as_ref() {
                    handler(event);
                }
            }
            Err(e) => warn!(error = %e, "Unrecognised control-channel message"),
        }
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// Owns the socket; lives on its own task until the channel closes.
struct EventLoop {
    writer: WsWriter,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    state: Arc<SessionState>,
}

impl EventLoop {
    async fn run(mut self, mut reader: SplitStream<WsStream>) {
        loop {
            let keep_going = tokio::select! {
                frame = reader.next() => self.on_frame(frame),
                command = self.commands.recv() => self.on_command(command).await,
            };
            if !keep_going {
                break;
            }
        }

        self.state.close();
        debug!("Event loop terminated");
    }

    fn on_frame(&self, frame: Option<std::result::Result<Message, WsError>>) -> bool {
        match frame {
            Some(Ok(Message::Text(text))) => {
                self.state.dispatch(&text);
                true
            }
            Some(Ok(Message::Close(_))) => {
                debug!("WebSocket closed by remote");
                false
            }
            Some(Err(e)) => {
                error!(error = %e, "WebSocket error");
                false
            }
            None => {
                debug!("WebSocket stream ended");
                false
            }
            Some(Ok(_)) => true,
        }
    }

    async fn on_command(&mut self, command: Option<SessionCommand>) -> bool {
        match command {
            Some(SessionCommand::Send {
                id,
                payload,
                response_tx,
            }) => {
                // Registered first so a fast response always finds its caller.
                self.state.pending.lock().insert(id, response_tx);

                if let Err(e) = self.writer.send(Message::Text(payload.into())).await {
                    if let Some(tx) = self.state.pending.lock().remove(&id) {
                        let _ = tx.send(Err(Error::WebSocket(e)));
                    }
                } else {
                    trace!(request_id = %id, "Request sent");
                }
                true
            }
            Some(SessionCommand::Abandon(id)) => {
                self.state.pending.lock().remove(&id);
                debug!(request_id = %id, "Dropped abandoned request");
                true
            }
            Some(SessionCommand::Shutdown) | None => {
                debug!("Closing control channel");
                let _ = self.writer.close().await;
                false
            }
        }
    }
}

// ============================================================================
// WsSession
// ============================================================================

/// WebSocket control-channel session.
///
/// Correlates responses to requests by id and routes id-less messages to
/// an optional event handler. Dropping every handle closes the channel.
pub struct WsSession {
    address: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: Arc<SessionState>,
    ids: RequestIdGenerator,
    request_timeout: Duration,
}

impl fmt::Debug for WsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsSession")
            .field("address", &self.address)
            .field("closed", &self.is_closed())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl WsSession {
    /// Performs the client handshake and starts the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the handshake fails. A non-101 answer
    /// surfaces as a stale endpoint, see
    /// [`is_stale_endpoint`](crate::resilience::is_stale_endpoint).
    pub async fn connect(address: &str) -> Result<Self> {
        debug!(%address, "Opening control channel");
        let (ws_stream, _response) = connect_async(address).await?;

        let (writer, reader) = ws_stream.split();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let state = Arc::new(SessionState::default());

        let event_loop = EventLoop {
            writer,
            commands: commands_rx,
            state: Arc::clone(&state),
        };
        tokio::spawn(event_loop.run(reader));

        Ok(Self {
            address: address.to_string(),
            commands: commands_tx,
            state,
            ids: RequestIdGenerator::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Sets the timeout applied by [`send`](Self::send).
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Returns the address this session connected to.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns `true` once the event loop has exited.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Returns the number of requests awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.pending.lock().len()
    }

    /// Sets the event handler callback.
    pub fn set_event_handler(&self, handler: EventHandler) {
        *self.state.event_handler.lock() = Some(handler);
    }

    /// Clears the event handler.
    pub fn clear_event_handler(&self) {
        *self.state.event_handler.lock() = None;
    }

    /// Calls `method` and returns its result.
    ///
    /// # Errors
    ///
    /// - [`Error::Remote`] if the remote answered with an error
    /// - [`Error::ConnectionClosed`] if the channel is closed
    /// - [`Error::RequestTimeout`] if no response arrived in time
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = Request::new(self.ids.next_id(), method, params);
        self.send(request).await?.into_result()
    }

    /// Sends a request with the session's request timeout.
    ///
    /// # Errors
    ///
    /// See [`send_with_timeout`](Self::send_with_timeout).
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.send_with_timeout(request, self.request_timeout).await
    }

    /// Sends a request and waits up to `request_timeout` for its response.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the channel is closed
    /// - [`Error::RequestTimeout`] if no response arrived in time
    /// - [`Error::Protocol`] if too many requests are already waiting
    pub async fn send_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        let pending = self.pending_count();
        if pending >= MAX_PENDING_REQUESTS {
            warn!(pending, max = MAX_PENDING_REQUESTS, "Too many pending requests");
            return Err(Error::protocol(format!(
                "Too many pending requests: {pending}/{MAX_PENDING_REQUESTS}"
            )));
        }

        let id = request.id;
        let payload = to_string(&request)?;
        let (response_tx, response_rx) = oneshot::channel();

        self.commands
            .send(SessionCommand::Send {
                id,
                payload,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self.commands.send(SessionCommand::Abandon(id));
                Err(Error::request_timeout(id, duration_ms(request_timeout)))
            }
        }
    }
}

impl Session for WsSession {
    fn on_disconnect(&self, observer: DisconnectObserver) {
        self.state.register(observer);
    }

    fn disconnect(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicU32;

    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    /// Behaviour of the test remote for each received request.
    #[derive(Clone, Copy)]
    enum Remote {
        /// Echo `params` back as `result`, after pushing one event.
        Echo,
        /// Answer every request with a protocol error.
        Fail,
        /// Close the socket on the first request.
        Hangup,
        /// Never answer.
        Silent,
    }

    /// Starts a one-connection WebSocket server and returns its address.
    async fn spawn_remote(behaviour: Remote) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            while let Some(Ok(message)) = ws.next().await {
                let Message::Text(text) = message else {
                    continue;
                };
                let request: Value = serde_json::from_str(&text).unwrap();
                let id = request["id"].clone();

                let reply = match behaviour {
                    Remote::Echo => {
                        let event = json!({ "method": "Target.targetCreated", "params": {} });
                        ws.send(Message::Text(event.to_string().into())).await.unwrap();
                        json!({ "id": id, "result": request["params"] })
                    }
                    Remote::Fail => {
                        json!({ "id": id, "error": { "code": -32000, "message": "Target closed" } })
                    }
                    Remote::Hangup => {
                        let _ = ws.close(None).await;
                        break;
                    }
                    Remote::Silent => continue,
                };
                ws.send(Message::Text(reply.to_string().into())).await.unwrap();
            }
        });

        format!("ws://127.0.0.1:{port}/devtools/browser/test")
    }

    #[tokio::test]
    async fn test_call_round_trip_and_events() {
        let address = spawn_remote(Remote::Echo).await;
        let session = WsSession::connect(&address).await.unwrap();
        assert_eq!(session.address(), address);

        let events = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&events);
        session.set_event_handler(Box::new(move |event| {
            assert_eq!(event.domain(), "Target");
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let result = session
            .call("Browser.getVersion", json!({ "echo": 1 }))
            .await
            .unwrap();

        assert_eq!(result, json!({ "echo": 1 }));
        assert_eq!(events.load(Ordering::SeqCst), 1);
        assert_eq!(session.pending_count(), 0);

        session.clear_event_handler();
        session.call("Browser.getVersion", json!({})).await.unwrap();
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pending_requests_are_bounded() {
        let address = spawn_remote(Remote::Silent).await;
        let session = Arc::new(WsSession::connect(&address).await.unwrap());

        for _ in 0..MAX_PENDING_REQUESTS {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.call("Runtime.evaluate", json!({})).await });
        }
        tokio::time::timeout(Duration::from_secs(2), async {
            while session.pending_count() < MAX_PENDING_REQUESTS {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let err = session.call("Runtime.evaluate", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }), "{err:?}");
        assert!(!err.is_transient());

        session.disconnect();
    }

    #[tokio::test]
    async fn test_remote_error_is_classified() {
        let address = spawn_remote(Remote::Fail).await;
        let session = WsSession::connect(&address).await.unwrap();

        let err = session.call("Page.navigate", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Target closed");
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_remote_close_fails_pending_and_notifies() {
        let address = spawn_remote(Remote::Hangup).await;
        let session = WsSession::connect(&address).await.unwrap();

        let (closed_tx, closed_rx) = oneshot::channel();
        session.on_disconnect(Box::new(move || {
            let _ = closed_tx.send(());
        }));

        let err = session.call("Browser.getVersion", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));

        closed_rx.await.unwrap();
        assert!(session.is_closed());

        // Late registration fires immediately.
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        session.on_disconnect(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let address = spawn_remote(Remote::Silent).await;
        let session = WsSession::connect(&address)
            .await
            .unwrap()
            .with_request_timeout(Duration::from_millis(50));

        let err = session.call("Runtime.evaluate", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::RequestTimeout { timeout_ms: 50, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_disconnect_notifies_observer() {
        let address = spawn_remote(Remote::Silent).await;
        let session = WsSession::connect(&address).await.unwrap();

        let (closed_tx, closed_rx) = oneshot::channel();
        session.on_disconnect(Box::new(move || {
            let _ = closed_tx.send(());
        }));

        session.disconnect();
        closed_rx.await.unwrap();
        assert!(session.is_closed());

        let err = session.call("Browser.close", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_connect_refused_is_transient() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = WsSession::connect(&format!("ws://127.0.0.1:{port}/devtools"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
