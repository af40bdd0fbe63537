//! Error types for the store layer.

use spread_connection::ConnectionError;
use spread_protocol::ProtocolError;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A local mutation could not be handed to the connection, so it was
    /// not applied either. `kind` is the wire type that failed (`set`,
    /// `delete`, `request_state`).
    #[error("failed to broadcast {kind}: {source}")]
    Synchronization {
        kind: String,
        #[source]
        source: ConnectionError,
    },

    /// The path given was not usable (e.g. empty).
    #[error(transparent)]
    InvalidPath(#[from] ProtocolError),
}
