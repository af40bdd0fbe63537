//! The connection: one link to the relay, its lifecycle, and its handlers.
//!
//! A [`Connection`] is a cheap, cloneable handle. Behind it:
//!
//! ```text
//!               send() ──→ mpsc ──→ [writer task] ──→ link.send()
//!                                                        │
//!   handlers ←── decode ←── [reader task] ←── link.recv() ┘
//!                               │
//!                      close event ──→ close handlers ──→ reconnect task
//! ```
//!
//! - `send()` never waits on the network: it encodes the message and
//!   queues the frame. One writer task per link drains the queue, so frames
//!   leave in the order they were submitted.
//! - The reader task decodes each frame and fans it out to every message
//!   handler. Frames that fail to decode go to the error handlers instead.
//! - When the link ends and the user didn't ask for it, a supervised task
//!   sleeps for `reconnect_delay` and dials again, repeating until it
//!   succeeds or `close()` is called.
//!
//! # Generations
//!
//! Every successful connect bumps a generation counter. A reader only
//! acts on its close event if its generation is still current, so a late
//! close from a replaced link can't knock the new one over.

use std::sync::Arc;

use parking_lot::Mutex;
use spread_protocol::{Codec, JsonCodec, Message};
use spread_transport::{
    CLOSE_ABNORMAL, Incoming, Link, Transport, WebSocketTransport,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    CloseEvent, ConnectionConfig, ConnectionError, ConnectionState,
    HandlerRegistry, MessageSink,
};

/// Mutable lifecycle bookkeeping, guarded by one lock.
struct Status {
    state: ConnectionState,
    /// Set by `close()`; suppresses reconnection for good.
    user_closed: bool,
    generation: u64,
    /// Queue feeding the current link's writer task.
    outbound: Option<mpsc::UnboundedSender<String>>,
    /// The pending reconnect supervisor, if any.
    reconnect: Option<JoinHandle<()>>,
}

/// State shared by every clone of a [`Connection`] and its tasks.
struct Shared {
    url: String,
    config: ConnectionConfig,
    codec: Arc<dyn Codec>,
    status: Mutex<Status>,
    /// Serializes concurrent `connect()` calls.
    connect_lock: tokio::sync::Mutex<()>,
    on_open: HandlerRegistry<()>,
    on_message: HandlerRegistry<Message>,
    on_close: HandlerRegistry<CloseEvent>,
    on_error: HandlerRegistry<ConnectionError>,
}

impl Shared {
    /// Settles the state after a failed dial. A `close()` that landed
    /// while the dial was in flight keeps the connection `Closed`.
    fn dial_failed(&self) {
        let mut status = self.status.lock();
        status.state = if status.user_closed {
            ConnectionState::Closed
        } else {
            ConnectionState::Disconnected
        };
    }

    fn is_user_closed(&self) -> bool {
        self.status.lock().user_closed
    }

    /// Decodes one inbound frame and routes it.
    fn dispatch(&self, text: &str) {
        match self.codec.decode(text) {
            Ok(message) => {
                tracing::debug!(url = %self.url, kind = message.kind(), "frame received");
                self.on_message.emit(&message);
            }
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "failed to decode frame");
                self.on_error.emit(&ConnectionError::Protocol(e));
            }
        }
    }
}

impl MessageSink for Shared {
    fn send(&self, message: &Message) -> Result<(), ConnectionError> {
        let status = self.status.lock();
        if status.user_closed {
            return Err(ConnectionError::Closed);
        }
        let outbound = match (&status.outbound, status.state) {
            (Some(outbound), ConnectionState::Connected) => outbound,
            _ => return Err(ConnectionError::NotConnected),
        };

        let text = self.codec.encode(message)?;
        outbound
            .send(text)
            .map_err(|_| ConnectionError::NotConnected)?;

        tracing::debug!(url = %self.url, kind = message.kind(), "frame queued");
        Ok(())
    }
}

/// A client connection to a relay endpoint.
///
/// Cheap to clone: every clone drives the same underlying link and
/// shares the same handler registries.
///
/// # Example
///
/// ```rust,no_run
/// use spread_connection::{Connection, ConnectionConfig};
///
/// # async fn run() -> Result<(), spread_connection::ConnectionError> {
/// let conn = Connection::new("ws://localhost:8080", ConnectionConfig::default());
/// conn.on_message(|msg| println!("got {}", msg.kind()));
/// conn.connect().await?;
/// conn.send(&spread_protocol::Message::ping())?;
/// conn.close();
/// # Ok(())
/// # }
/// ```
pub struct Connection<T: Transport = WebSocketTransport> {
    shared: Arc<Shared>,
    transport: Arc<T>,
}

impl<T: Transport> Clone for Connection<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl Connection<WebSocketTransport> {
    /// Creates an unconnected WebSocket connection to `url`.
    pub fn new(url: impl Into<String>, config: ConnectionConfig) -> Self {
        Self::with_transport(url, config, WebSocketTransport::new())
    }
}

impl<T: Transport> Connection<T> {
    /// Creates an unconnected connection over a custom transport.
    pub fn with_transport(
        url: impl Into<String>,
        config: ConnectionConfig,
        transport: T,
    ) -> Self {
        Self::with_parts(url, config, transport, JsonCodec)
    }

    /// Creates an unconnected connection with a custom transport and codec.
    pub fn with_parts(
        url: impl Into<String>,
        config: ConnectionConfig,
        transport: T,
        codec: impl Codec,
    ) -> Self {
        let shared = Shared {
            url: url.into(),
            config,
            codec: Arc::new(codec),
            status: Mutex::new(Status {
                state: ConnectionState::Disconnected,
                user_closed: false,
                generation: 0,
                outbound: None,
                reconnect: None,
            }),
            connect_lock: tokio::sync::Mutex::new(()),
            on_open: HandlerRegistry::new("open"),
            on_message: HandlerRegistry::new("message"),
            on_close: HandlerRegistry::new("close"),
            on_error: HandlerRegistry::new("error"),
        };
        Self {
            shared: Arc::new(shared),
            transport: Arc::new(transport),
        }
    }

    /// The endpoint this connection dials.
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// The configuration this connection was built with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.status.lock().state
    }

    /// `true` only while connected and not closed by the user.
    pub fn is_open(&self) -> bool {
        let status = self.shared.status.lock();
        status.state.is_connected() && !status.user_closed
    }

    /// Connects to the endpoint, waiting at most `config.timeout`.
    ///
    /// A second call while already connected is a no-op.
    ///
    /// # Errors
    /// - [`ConnectionError::Closed`]: `close()` was already called.
    /// - [`ConnectionError::Timeout`]: the handshake missed the deadline.
    /// - [`ConnectionError::ConnectFailed`]: dialling failed; the
    ///   transport error is the source.
    pub async fn connect(&self) -> Result<(), ConnectionError> {
        let _connecting = self.shared.connect_lock.lock().await;

        {
            let mut status = self.shared.status.lock();
            if status.user_closed {
                return Err(ConnectionError::Closed);
            }
            if status.state.is_connected() {
                return Ok(());
            }
            status.state = ConnectionState::Connecting;
        }

        let url = self.shared.url.as_str();
        let timeout = self.shared.config.timeout;
        tracing::debug!(url, ?timeout, "connecting");

        let link = match tokio::time::timeout(timeout, self.transport.dial(url)).await {
            Ok(Ok(link)) => Arc::new(link),
            Ok(Err(source)) => {
                self.shared.dial_failed();
                return Err(ConnectionError::ConnectFailed {
                    url: url.to_string(),
                    source,
                });
            }
            Err(_) => {
                self.shared.dial_failed();
                return Err(ConnectionError::Timeout {
                    url: url.to_string(),
                    timeout,
                });
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let generation = {
            let mut status = self.shared.status.lock();
            if status.user_closed {
                // close() raced the dial; the queue is dropped unused so
                // the writer task below only closes the link.
                status.state = ConnectionState::Closed;
                drop(tx);
                None
            } else {
                status.generation += 1;
                status.state = ConnectionState::Connected;
                status.outbound = Some(tx);
                Some(status.generation)
            }
        };

        tokio::spawn(write_loop(Arc::clone(&link), rx));
        let Some(generation) = generation else {
            return Err(ConnectionError::Closed);
        };
        tracing::info!(url, link = %link.id(), generation, "connected");
        tokio::spawn(read_loop(self.clone(), link, generation));

        self.shared.on_open.emit(&());
        Ok(())
    }

    /// Encodes `message` and queues it on the link.
    ///
    /// Returns as soon as the frame is queued; the protocol has no delivery
    /// acknowledgement to wait for.
    ///
    /// # Errors
    /// - [`ConnectionError::Closed`]: `close()` was called.
    /// - [`ConnectionError::NotConnected`]: not (yet, or currently)
    ///   connected.
    pub fn send(&self, message: &Message) -> Result<(), ConnectionError> {
        self.shared.send(message)
    }

    /// A sending handle that can outlive this `Connection` value.
    pub fn sink(&self) -> Arc<dyn MessageSink> {
        self.shared.clone()
    }

    /// Registers a handler for every successful connect (including
    /// reconnects).
    pub fn on_open<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.on_open.register(move |_: &()| handler());
    }

    /// Registers a handler for every decoded inbound message.
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.shared.on_message.register(handler);
    }

    /// Registers a handler for every close event reported by the link.
    pub fn on_close<F>(&self, handler: F)
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        self.shared.on_close.register(handler);
    }

    /// Registers a handler for inbound decode failures and link errors.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&ConnectionError) + Send + Sync + 'static,
    {
        self.shared.on_error.register(handler);
    }

    /// Closes the connection for good. Idempotent.
    ///
    /// Cancels any pending reconnect, then lets the writer flush what is
    /// already queued and close the link. Close handlers are NOT called
    /// from here; they fire when the link reports its close.
    pub fn close(&self) {
        let mut status = self.shared.status.lock();
        if status.user_closed {
            return;
        }
        status.user_closed = true;

        if let Some(reconnect) = status.reconnect.take() {
            reconnect.abort();
        }

        // Only a live link has a close event still to come.
        status.state = match status.state {
            ConnectionState::Connected => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        };
        // Dropping the sender ends the writer task, which closes the link.
        status.outbound = None;

        tracing::info!(url = %self.shared.url, "connection closed by user");
    }

    /// Handles the end of the link identified by `generation`.
    fn handle_close(&self, generation: u64, event: CloseEvent) {
        let reconnect = {
            let mut status = self.shared.status.lock();
            if status.generation != generation {
                tracing::debug!(generation, "ignoring close from a replaced link");
                return;
            }
            status.state = ConnectionState::Closed;
            status.outbound = None;
            self.shared.config.auto_reconnect && !status.user_closed
        };

        tracing::info!(
            url = %self.shared.url,
            code = event.code,
            reason = %event.reason,
            "connection closed"
        );
        self.shared.on_close.emit(&event);

        if reconnect {
            self.spawn_reconnect();
        }
    }

    /// Starts the supervised retry task.
    fn spawn_reconnect(&self) {
        let conn = self.clone();
        let handle = tokio::spawn(async move {
            let delay = conn.shared.config.reconnect_delay;
            let mut attempt: u32 = 0;
            loop {
                tokio::time::sleep(delay).await;
                if conn.shared.is_user_closed() {
                    return;
                }
                attempt += 1;
                match conn.connect().await {
                    Ok(()) => {
                        tracing::info!(url = %conn.shared.url, attempt, "reconnected");
                        return;
                    }
                    Err(ConnectionError::Closed) => return,
                    Err(e) => {
                        tracing::warn!(
                            url = %conn.shared.url,
                            attempt,
                            error = %e,
                            "reconnect attempt failed"
                        );
                    }
                }
            }
        });

        let mut status = self.shared.status.lock();
        if status.user_closed {
            handle.abort();
        } else {
            status.reconnect = Some(handle);
        }
    }
}

/// Drains the outbound queue onto the link, then closes the link.
async fn write_loop<L: Link>(link: Arc<L>, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = rx.recv().await {
        if let Err(e) = link.send(&text).await {
            tracing::warn!(link = %link.id(), error = %e, "send failed, dropping link writer");
            return;
        }
    }
    if let Err(e) = link.close().await {
        tracing::debug!(link = %link.id(), error = %e, "link close failed");
    }
}

/// Reads frames until the link ends, then reports the close.
async fn read_loop<T: Transport>(conn: Connection<T>, link: Arc<T::Link>, generation: u64) {
    let event = loop {
        match link.recv().await {
            Ok(Incoming::Text(text)) => conn.shared.dispatch(&text),
            Ok(Incoming::Closed { code, reason }) => break CloseEvent { code, reason },
            Err(e) => {
                let reason = e.to_string();
                conn.shared.on_error.emit(&ConnectionError::Transport(e));
                break CloseEvent {
                    code: CLOSE_ABNORMAL,
                    reason,
                };
            }
        }
    };
    conn.handle_close(generation, event);
}
