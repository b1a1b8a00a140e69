//! Persistent WebSocket transport.
//!
//! All calls share one `ws://<host>/rpc` connection. Each call goes out under
//! a wire id taken from the transport's own counter, so clients sharing one
//! transport never collide. A background reader task routes every reply to
//! the caller waiting on that wire id and puts the caller's id back into the
//! envelope. Frames without an id are device notifications and go to
//! [`WsTransport::subscribe`] receivers. Writes are serialized, reads are
//! multiplexed.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::value::RawValue;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};

use super::{Transport, endpoint_url};
use crate::context::CallContext;
use crate::error::TransportError;
use crate::protocol::{FrameHeader, Notification, Request, RequestId};

/// Buffered notifications per subscriber before the oldest are dropped
const NOTIFICATION_CAPACITY: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

/// Caller waiting for the reply to one request
struct PendingCall {
    /// Id the caller put on the request
    caller_id: RequestId,
    tx: oneshot::Sender<Result<String, TransportError>>,
}

/// Waiting callers keyed by wire id
type PendingMap = Arc<StdMutex<HashMap<u64, PendingCall>>>;

fn lock_pending(pending: &PendingMap) -> MutexGuard<'_, HashMap<u64, PendingCall>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fail every waiting caller with an error built by `make_error`.
fn drain_pending(pending: &PendingMap, make_error: impl Fn() -> TransportError) {
    let drained: Vec<PendingCall> = lock_pending(pending).drain().map(|(_, call)| call).collect();
    for call in drained {
        let _ = call.tx.send(Err(make_error()));
    }
}

/// Removes a call's pending entry when the call ends for any reason,
/// including cancellation.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    wire_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock_pending(self.pending).remove(&self.wire_id);
    }
}

/// Replace the wire id in a reply envelope with the caller's id.
///
/// Members other than `id` are carried over as raw text, so `result` keeps
/// its exact bytes.
fn restore_id(text: &str, caller_id: &RequestId) -> Result<String, serde_json::Error> {
    let mut envelope: BTreeMap<String, Box<RawValue>> = serde_json::from_str(text)?;
    envelope.insert("id".to_string(), serde_json::value::to_raw_value(caller_id)?);
    serde_json::to_string(&envelope)
}

pub struct WsTransport {
    url: String,
    sender: Mutex<WsSink>,
    pending: PendingMap,
    next_id: AtomicU64,
    notifications: broadcast::Sender<Notification>,
    reader: StdMutex<Option<JoinHandle<()>>>,
    closed: Arc<AtomicBool>,
}

impl WsTransport {
    /// Open the WebSocket channel to the device at `address` (`host[:port]`
    /// or a `ws://` URL). TLS (`wss://`) is not supported.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress`, `WebSocket` if the handshake fails, or
    /// `Cancelled`/`DeadlineExceeded` from `ctx`.
    pub async fn connect(ctx: &CallContext, address: &str) -> Result<Self, TransportError> {
        let url = endpoint_url(address, "ws", &["ws"])?;
        debug!("Connecting WebSocket transport to {}", url);

        let (stream, _) = ctx
            .run(async { connect_async(url.as_str()).await.map_err(TransportError::from) })
            .await?;

        Ok(Self::from_stream(url, stream))
    }

    fn from_stream(url: String, stream: WsStream) -> Self {
        let (sink, stream) = stream.split();

        let pending: PendingMap = Arc::new(StdMutex::new(HashMap::new()));
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));

        let reader = tokio::spawn(read_loop(
            stream,
            pending.clone(),
            notifications.clone(),
            closed.clone(),
        ));

        Self {
            url,
            sender: Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(1),
            notifications,
            reader: StdMutex::new(Some(reader)),
            closed,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Receive the device's unsolicited notifications from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Number of calls still waiting for a reply.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    async fn send_and_wait(
        &self,
        text: String,
        rx: oneshot::Receiver<Result<String, TransportError>>,
    ) -> Result<String, TransportError> {
        {
            let mut sender = self.sender.lock().await;
            sender.send(WsMessage::text(text)).await?;
        }

        rx.await.map_err(|_| TransportError::Closed)?
    }

    fn abort_reader(&self) {
        let handle = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    pending: PendingMap,
    notifications: broadcast::Sender<Notification>,
    closed: Arc<AtomicBool>,
) {
    let reason = loop {
        match stream.next().await {
            Some(Ok(WsMessage::Text(text))) => {
                dispatch_frame(text.as_str(), &pending, &notifications);
            }
            Some(Ok(WsMessage::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => dispatch_frame(text, &pending, &notifications),
                Err(e) => warn!("Dropping non UTF-8 binary frame: {}", e),
            },
            Some(Ok(WsMessage::Close(frame))) => {
                debug!("WebSocket closed by device: {:?}", frame);
                break "closed by device".to_string();
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                error!("WebSocket read failed: {}", e);
                break e.to_string();
            }
            None => break "stream ended".to_string(),
        }
    };

    closed.store(true, Ordering::Release);
    drain_pending(&pending, || TransportError::ConnectionLost(reason.clone()));
}

fn dispatch_frame(
    text: &str,
    pending: &PendingMap,
    notifications: &broadcast::Sender<Notification>,
) {
    trace!("WebSocket frame: {}", text);

    let header: FrameHeader = match serde_json::from_str(text) {
        Ok(header) => header,
        Err(e) => {
            warn!("Dropping unparseable frame: {}", e);
            return;
        }
    };

    match header.id {
        Some(RequestId::Number(wire_id)) => {
            let waiter = lock_pending(pending).remove(&wire_id);
            match waiter {
                Some(call) => {
                    let reply = restore_id(text, &call.caller_id).map_err(TransportError::from);
                    let _ = call.tx.send(reply);
                }
                None => debug!("No caller waiting for reply id {}", wire_id),
            }
        }
        Some(id) => debug!("No caller waiting for reply id {}", id),
        None if header.method.is_some() => match serde_json::from_str::<Notification>(text) {
            Ok(notification) => {
                // No subscribers is fine
                let _ = notifications.send(notification);
            }
            Err(e) => warn!("Dropping malformed notification: {}", e),
        },
        None => warn!("Dropping frame with neither id nor method"),
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn call(&self, ctx: &CallContext, request: &Request) -> Result<String, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let wire_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let wire = Request {
            id: RequestId::Number(wire_id),
            ..request.clone()
        };
        let text = serde_json::to_string(&wire)?;

        let (tx, rx) = oneshot::channel();
        lock_pending(&self.pending).insert(
            wire_id,
            PendingCall {
                caller_id: request.id.clone(),
                tx,
            },
        );
        let _guard = PendingGuard {
            pending: &self.pending,
            wire_id,
        };

        // The reader may have drained the map between the check and the insert
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        debug!(
            "WebSocket call {} (id {}, wire id {})",
            request.method, request.id, wire_id
        );
        ctx.run(self.send_and_wait(text, rx)).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        let already_closed = self.closed.swap(true, Ordering::AcqRel);
        self.abort_reader();
        drain_pending(&self.pending, || TransportError::Closed);

        if !already_closed {
            debug!("Closing WebSocket transport to {}", self.url);
            let mut sender = self.sender.lock().await;
            // The device may already be gone; closing is best effort
            let _ = sender.close().await;
        }

        Ok(())
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.abort_reader();
    }
}
