//! Error types for the protocol layer.
//!
//! Each crate in Spread defines its own error enum. When you see a
//! `ProtocolError`, the problem is in how a frame was shaped or parsed,
//! not in networking or in the replicated tree.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a [`Message`](crate::Message) into text).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame is not well-formed JSON.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame parsed, but has no `type` field (or `type` is null).
    #[error("invalid message: missing type field")]
    MissingType,

    /// The frame parsed, but violates protocol rules, e.g. a `set`
    /// without a `path`, or a `type` that isn't a string.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A path must address at least one key.
    #[error("path must contain at least one key")]
    EmptyPath,
}
