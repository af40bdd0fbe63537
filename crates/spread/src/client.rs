//! `SpreadClient` builder and lifecycle.
//!
//! This is the entry point for applications. It ties the layers together:
//! transport → connection → store, and pulls the peer group's state once
//! the link is up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use spread_connection::{CloseEvent, Connection, ConnectionError};
use spread_protocol::Message;
use spread_store::Store;
use spread_transport::{Transport, WebSocketTransport};

use crate::{ClientConfig, SpreadError};

/// Builder for configuring and connecting a [`SpreadClient`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use spread::SpreadClient;
///
/// # async fn run() -> Result<(), spread::SpreadError> {
/// let client = SpreadClient::builder()
///     .timeout(Duration::from_secs(5))
///     .request_state(false)
///     .connect("ws://localhost:8080")
///     .await?;
///
/// client.store().set("status", "online")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpreadClientBuilder {
    config: ClientConfig,
}

impl SpreadClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets how long `connect` waits for the handshake.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.connection.timeout = timeout;
        self
    }

    /// Enables or disables reconnecting after an unsolicited close.
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.connection.auto_reconnect = enabled;
        self
    }

    /// Sets the delay before each reconnect attempt.
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.connection.reconnect_delay = delay;
        self
    }

    /// Enables or disables requesting peers' state after connecting.
    pub fn request_state(mut self, enabled: bool) -> Self {
        self.config.request_state = enabled;
        self
    }

    /// Connects to `url` over WebSocket.
    ///
    /// # Errors
    /// Whatever the initial connect reports: a timeout, an invalid URL,
    /// or a failed dial. No reconnect is attempted for the initial connect.
    pub async fn connect(
        self,
        url: impl Into<String>,
    ) -> Result<SpreadClient<WebSocketTransport>, SpreadError> {
        self.connect_with(url, WebSocketTransport::new()).await
    }

    /// Connects to `url` over a custom transport.
    ///
    /// # Errors
    /// As for [`connect`](Self::connect).
    pub async fn connect_with<T: Transport>(
        self,
        url: impl Into<String>,
        transport: T,
    ) -> Result<SpreadClient<T>, SpreadError> {
        let connection = Connection::with_transport(url, self.config.connection, transport);
        let store = Store::new(&connection);
        let connected = Arc::new(AtomicBool::new(false));

        // Internal hooks go first so they run before anything the
        // application registers later.
        {
            let connected = Arc::clone(&connected);
            let url = connection.url().to_owned();
            connection.on_close(move |event: &CloseEvent| {
                connected.store(false, Ordering::SeqCst);
                tracing::warn!(
                    url = %url,
                    code = event.code,
                    reason = %event.reason,
                    "disconnected"
                );
            });
        }
        {
            let url = connection.url().to_owned();
            connection.on_error(move |e: &ConnectionError| {
                tracing::warn!(url = %url, error = %e, "connection error");
            });
        }
        {
            let connected = Arc::clone(&connected);
            let request_state = self.config.request_state;
            // Weak: this handler lives inside the connection it sends on.
            let sink = Arc::downgrade(&connection.sink());
            connection.on_open(move || {
                connected.store(true, Ordering::SeqCst);
                if !request_state {
                    return;
                }
                let Some(sink) = sink.upgrade() else { return };
                if let Err(e) = sink.send(&Message::request_state()) {
                    tracing::warn!(error = %e, "failed to request state");
                }
            });
        }

        connection.connect().await?;
        tracing::info!(url = %connection.url(), "client ready");

        Ok(SpreadClient {
            connection,
            store,
            connected,
        })
    }
}

/// A connected client: one [`Connection`] plus the [`Store`] it feeds.
///
/// Build one with [`SpreadClient::builder`] or [`crate::connect`].
pub struct SpreadClient<T: Transport = WebSocketTransport> {
    connection: Connection<T>,
    store: Store,
    connected: Arc<AtomicBool>,
}

impl SpreadClient<WebSocketTransport> {
    /// Creates a new builder.
    pub fn builder() -> SpreadClientBuilder {
        SpreadClientBuilder::new()
    }
}

impl<T: Transport> SpreadClient<T> {
    /// The replicated store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    /// The endpoint this client talks to.
    pub fn url(&self) -> &str {
        self.connection.url()
    }

    /// `true` while the link is up and `disconnect` hasn't been called.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.connection.is_open()
    }

    /// Closes the connection for good; no reconnect follows.
    ///
    /// Also happens when the client is dropped. Clones of
    /// [`connection`](Self::connection) are closed with it.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.connection.close();
    }

    /// Registers a handler for every close of the link.
    pub fn on_disconnect<F>(&self, handler: F)
    where
        F: Fn(&CloseEvent) + Send + Sync + 'static,
    {
        self.connection.on_close(handler);
    }

    /// Registers a handler for inbound decode failures and link errors.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(&ConnectionError) + Send + Sync + 'static,
    {
        self.connection.on_error(handler);
    }

    /// Sends a ping; a peer's store answers with a pong.
    ///
    /// # Errors
    /// [`SpreadError::Connection`] if the link isn't up or was closed.
    pub fn ping(&self) -> Result<(), SpreadError> {
        self.connection.send(&Message::ping())?;
        Ok(())
    }
}

impl<T: Transport> Drop for SpreadClient<T> {
    /// Dropping the client closes its connection, which stops the reader
    /// task and any pending reconnect.
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<T: Transport> std::fmt::Debug for SpreadClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpreadClient")
            .field("url", &self.url())
            .field("state", &self.connection.state())
            .finish()
    }
}
