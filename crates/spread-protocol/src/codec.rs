//! Codec trait and the JSON implementation.
//!
//! A "codec" (coder/decoder) converts between [`Message`]s and the text
//! frames that go over the socket. The connection layer doesn't care HOW
//! messages are serialized; it just needs something that implements
//! [`Codec`].
//!
//! Peers agree on JSON, so [`JsonCodec`] is the one shipped here.

use crate::{Message, ProtocolError, Value};

/// Encodes messages to text frames and decodes them back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → the codec is shared between the caller's thread
///   (encoding outbound messages) and the connection's reader task
///   (decoding inbound frames).
/// - `'static` → it lives as long as the connection that owns it.
///
/// The methods are not generic, so the trait is object-safe and a
/// connection can hold an `Arc<dyn Codec>`.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message into a text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode(&self, message: &Message) -> Result<String, ProtocolError>;

    /// Parses a text frame into a message.
    ///
    /// # Errors
    /// - [`ProtocolError::Decode`] if the text is not well-formed.
    /// - [`ProtocolError::MissingType`] if there is no `type` field.
    /// - [`ProtocolError::InvalidMessage`] if a known kind carries a
    ///   payload of the wrong shape.
    ///
    /// Unknown kinds are NOT an error; they come back as
    /// [`Message::Unknown`].
    fn decode(&self, text: &str) -> Result<Message, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use spread_protocol::{Codec, JsonCodec, Message, Path};
///
/// let codec = JsonCodec;
///
/// let msg = Message::set(Path::new(["config", "name"]).unwrap(), "Peter");
/// let text = codec.encode(&msg).unwrap();
/// assert_eq!(
///     text,
///     r#"{"type":"set","data":{"path":["config","name"],"value":"Peter"}}"#
/// );
///
/// let decoded = codec.decode(&text).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, message: &Message) -> Result<String, ProtocolError> {
        serde_json::to_string(message).map_err(ProtocolError::Encode)
    }

    fn decode(&self, text: &str) -> Result<Message, ProtocolError> {
        // Two steps: first "is this JSON at all?", then "is it a frame?".
        // Keeping them apart lets a `{"type":"ping"}` without `data` through
        // while still rejecting garbage with a parse error.
        let frame: Value =
            serde_json::from_str(text).map_err(ProtocolError::Decode)?;
        Message::from_frame(frame)
    }
}
