/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The URL is not a `ws://` or `wss://` endpoint.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Dialling the endpoint or completing the WebSocket handshake failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The link was already closed.
    #[error("link closed")]
    Closed,
}
