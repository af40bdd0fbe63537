//! Connection lifecycle for Spread.
//!
//! This crate owns the link to the relay:
//!
//! 1. **Connecting**: dialling with a deadline ([`Connection::connect`])
//! 2. **Sending**: queueing encoded frames in order ([`Connection::send`])
//! 3. **Receiving**: decoding frames and fanning them out to handlers
//! 4. **Reconnecting**: retrying after an unsolicited close, until the
//!    user calls [`Connection::close`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Store (above)  ← registers a message handler, sends through a MessageSink
//!     ↕
//! Connection (this crate)  ← lifecycle, handlers, reconnect supervisor
//!     ↕
//! Transport + Protocol (below)  ← links, frames, codec
//! ```

mod config;
mod connection;
mod error;
mod handlers;

pub use config::{CloseEvent, ConnectionConfig, ConnectionState};
pub use connection::Connection;
pub use error::ConnectionError;
pub use handlers::{Handler, HandlerRegistry};

use spread_protocol::Message;

/// Somewhere to hand outbound messages.
///
/// [`Connection::sink`] returns one; the store holds it instead of the
/// connection itself, so it doesn't need to know the transport type.
/// Sending is synchronous: implementations queue, they don't wait.
pub trait MessageSink: Send + Sync + 'static {
    /// Queues `message` for delivery.
    ///
    /// # Errors
    /// Whatever the underlying connection reports (closed, not connected,
    /// encode failure).
    fn send(&self, message: &Message) -> Result<(), ConnectionError>;
}
