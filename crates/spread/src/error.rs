//! Unified error type for the Spread client.

use spread_connection::ConnectionError;
use spread_protocol::ProtocolError;
use spread_store::StoreError;
use spread_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `spread` crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SpreadError {
    /// A transport-level error (URL, dial, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid path).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A connection-level error (connect, timeout, closed).
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A store-level error (broadcast failed, invalid path).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The broad category of a [`SpreadError`], independent of which layer
/// raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connecting or the handshake failed, or the link isn't up.
    ConnectionFailure,
    /// The connection was explicitly closed.
    ConnectionClosed,
    /// `connect()` missed its deadline.
    Timeout,
    /// A frame (or a path) was malformed.
    InvalidMessage,
    /// A local mutation couldn't be broadcast.
    SynchronizationFailure,
}

impl SpreadError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(e) => transport_kind(e),
            Self::Protocol(_) => ErrorKind::InvalidMessage,
            Self::Connection(e) => connection_kind(e),
            Self::Store(StoreError::Synchronization { .. }) => ErrorKind::SynchronizationFailure,
            Self::Store(StoreError::InvalidPath(_)) => ErrorKind::InvalidMessage,
        }
    }
}

fn transport_kind(error: &TransportError) -> ErrorKind {
    match error {
        TransportError::Closed => ErrorKind::ConnectionClosed,
        _ => ErrorKind::ConnectionFailure,
    }
}

fn connection_kind(error: &ConnectionError) -> ErrorKind {
    match error {
        ConnectionError::Timeout { .. } => ErrorKind::Timeout,
        ConnectionError::Closed => ErrorKind::ConnectionClosed,
        ConnectionError::Protocol(_) => ErrorKind::InvalidMessage,
        ConnectionError::Transport(e) => transport_kind(e),
        ConnectionError::ConnectFailed { .. } | ConnectionError::NotConnected => {
            ErrorKind::ConnectionFailure
        }
    }
}
