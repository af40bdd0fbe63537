//! Error types for the connection layer.

use std::time::Duration;

use spread_protocol::ProtocolError;
use spread_transport::TransportError;

/// Errors that can occur while connecting, sending, or receiving.
///
/// These cover the full lifecycle of a connection: dialling, the
/// handshake deadline, use after an explicit close, and frames that
/// arrive malformed.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Dialling or the WebSocket handshake failed.
    #[error("failed to connect to {url}: {source}")]
    ConnectFailed {
        url: String,
        #[source]
        source: TransportError,
    },

    /// The handshake did not finish before the configured deadline.
    #[error("connection to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// A send was attempted before the connection was established (or
    /// while it is down between reconnect attempts).
    #[error("not connected")]
    NotConnected,

    /// The connection was explicitly closed and can't be used again.
    #[error("connection is closed")]
    Closed,

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The link failed while it was open.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
