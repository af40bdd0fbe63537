//! Transport abstraction layer for Spread.
//!
//! Provides the [`Transport`] and [`Link`] traits that abstract over how a
//! client reaches the relay. A transport *dials* a URL and yields a link; a
//! link moves text frames in both directions until one side closes it.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket dialer via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketLink, WebSocketTransport};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

impl LinkId {
    /// Creates a new `LinkId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

/// What a [`Link`] hands back from [`Link::recv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// One text frame.
    Text(String),
    /// The remote side closed the link (or it dropped).
    Closed { code: u16, reason: String },
}

/// Close code used when the link ended without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Dials outgoing links.
///
/// The futures are spelled out as `impl Future + Send` so that callers
/// generic over `T: Transport` can move them onto a spawned Tokio task.
pub trait Transport: Send + Sync + 'static {
    /// The link type produced by this transport.
    type Link: Link;

    /// Opens a new link to `url`.
    fn dial(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Link, TransportError>> + Send;
}

/// A single open link that can send and receive text frames.
///
/// Sending and receiving must not block each other: a reader parked in
/// [`recv`](Link::recv) must never hold up a concurrent [`send`](Link::send).
pub trait Link: Send + Sync + 'static {
    /// Sends one text frame to the remote peer.
    fn send(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame, or the close event that ended the link.
    fn recv(&self) -> impl Future<Output = Result<Incoming, TransportError>> + Send;

    /// Closes the link.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this link.
    fn id(&self) -> LinkId;
}

/// Checks that `url` is a `ws://` or `wss://` endpoint with a host.
///
/// # Errors
/// Returns [`TransportError::InvalidUrl`] otherwise.
pub fn validate_url(url: &str) -> Result<(), TransportError> {
    let invalid = |reason: &str| TransportError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let rest = url
        .strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"))
        .ok_or_else(|| invalid("scheme must be ws or wss"))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_id_new_and_into_inner() {
        let id = LinkId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_link_id_display() {
        assert_eq!(LinkId::new(7).to_string(), "link-7");
    }

    #[test]
    fn test_validate_url_accepts_ws_and_wss() {
        assert!(validate_url("ws://localhost:8080").is_ok());
        assert!(validate_url("wss://relay.example.com:443/path").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        let err = validate_url("http://localhost:8080").unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_validate_url_rejects_missing_host() {
        assert!(validate_url("ws://").is_err());
        assert!(validate_url("ws:///path").is_err());
    }
}
