//! The six message kinds that travel on the wire.
//!
//! Every frame has the same outer shape:
//!
//! ```text
//! { "type": "<kind>", "data": { ...kind-specific payload... } }
//! ```
//!
//! | type            | data                                 |
//! |-----------------|--------------------------------------|
//! | `set`           | `{ "path": [..], "value": <any> }`   |
//! | `delete`        | `{ "path": [..] }`                   |
//! | `request_state` | `{}`                                 |
//! | `state`         | `{ "state": { .. } }`                |
//! | `ping`          | `{}`                                 |
//! | `pong`          | `{}`                                 |
//!
//! A frame whose `type` we don't recognize is kept as
//! [`Message::Unknown`] rather than rejected, so a newer peer can't knock
//! an older one off the wire.

use serde::{Deserialize, Serialize, Serializer};

use crate::{Mapping, Path, ProtocolError, Value};

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A peer wrote `value` at `path`.
    Set { path: Path, value: Value },

    /// A peer removed whatever was at `path`.
    Delete { path: Path },

    /// "Send me everything you have."
    RequestState,

    /// A full snapshot of a peer's root mapping.
    State { state: Mapping },

    /// Keep-alive probe. Answered with [`Message::Pong`].
    Ping,

    /// Keep-alive reply.
    Pong,

    /// A frame with an unrecognized `type`. Preserved as-is and ignored by
    /// the store.
    Unknown { kind: String, data: Value },
}

impl Message {
    pub const SET: &'static str = "set";
    pub const DELETE: &'static str = "delete";
    pub const REQUEST_STATE: &'static str = "request_state";
    pub const STATE: &'static str = "state";
    pub const PING: &'static str = "ping";
    pub const PONG: &'static str = "pong";

    /// Builds a `Set` message.
    pub fn set(path: Path, value: impl Into<Value>) -> Self {
        Self::Set {
            path,
            value: value.into(),
        }
    }

    /// Builds a `Delete` message.
    pub fn delete(path: Path) -> Self {
        Self::Delete { path }
    }

    /// Builds a `RequestState` message.
    pub fn request_state() -> Self {
        Self::RequestState
    }

    /// Builds a `State` message carrying a full snapshot.
    pub fn state(state: Mapping) -> Self {
        Self::State { state }
    }

    /// Builds a `Ping` message.
    pub fn ping() -> Self {
        Self::Ping
    }

    /// Builds a `Pong` message.
    pub fn pong() -> Self {
        Self::Pong
    }

    /// The wire `type` string for this message.
    pub fn kind(&self) -> &str {
        match self {
            Self::Set { .. } => Self::SET,
            Self::Delete { .. } => Self::DELETE,
            Self::RequestState => Self::REQUEST_STATE,
            Self::State { .. } => Self::STATE,
            Self::Ping => Self::PING,
            Self::Pong => Self::PONG,
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// Interprets an already-parsed JSON document as a frame.
    ///
    /// - Missing or null `type` → [`ProtocolError::MissingType`].
    /// - Missing or null `data` → treated as `{}`.
    /// - Known `type` with a payload of the wrong shape →
    ///   [`ProtocolError::InvalidMessage`].
    /// - Unknown `type` → [`Message::Unknown`].
    pub fn from_frame(frame: Value) -> Result<Self, ProtocolError> {
        // Anything other than an object can't carry a `type` field.
        let Value::Object(mut fields) = frame else {
            return Err(ProtocolError::MissingType);
        };

        let kind = match fields.remove("type") {
            None | Some(Value::Null) => return Err(ProtocolError::MissingType),
            Some(Value::String(kind)) => kind,
            Some(other) => {
                return Err(ProtocolError::InvalidMessage(format!(
                    "type must be a string, got {other}"
                )));
            }
        };

        let data = match fields.remove("data") {
            None | Some(Value::Null) => Value::Object(Mapping::new()),
            Some(data) => data,
        };

        let message = match kind.as_str() {
            Self::SET => {
                let payload: SetPayload = payload_of(&kind, data)?;
                Self::Set {
                    path: payload.path,
                    value: payload.value,
                }
            }
            Self::DELETE => {
                let payload: DeletePayload = payload_of(&kind, data)?;
                Self::Delete { path: payload.path }
            }
            Self::STATE => {
                let payload: StatePayload = payload_of(&kind, data)?;
                Self::State {
                    state: payload.state,
                }
            }
            Self::REQUEST_STATE => Self::RequestState,
            Self::PING => Self::Ping,
            Self::PONG => Self::Pong,
            _ => Self::Unknown { kind, data },
        };
        Ok(message)
    }
}

fn payload_of<T: for<'de> Deserialize<'de>>(
    kind: &str,
    data: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|e| {
        ProtocolError::InvalidMessage(format!("malformed {kind} payload: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SetPayload {
    path: Path,
    #[serde(default)]
    value: Value,
}

#[derive(Deserialize)]
struct DeletePayload {
    path: Path,
}

#[derive(Deserialize)]
struct StatePayload {
    state: Mapping,
}

/// The outer `{type, data}` frame, borrowing its payload for encoding.
#[derive(Serialize)]
struct Frame<'a, D: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: D,
}

#[derive(Serialize)]
struct SetRef<'a> {
    path: &'a Path,
    value: &'a Value,
}

#[derive(Serialize)]
struct DeleteRef<'a> {
    path: &'a Path,
}

#[derive(Serialize)]
struct StateRef<'a> {
    state: &'a Mapping,
}

/// A braced struct with no fields serializes as `{}`, not `null`.
#[derive(Serialize)]
struct Empty {}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.kind();
        match self {
            Self::Set { path, value } => Frame {
                kind,
                data: SetRef { path, value },
            }
            .serialize(serializer),
            Self::Delete { path } => Frame {
                kind,
                data: DeleteRef { path },
            }
            .serialize(serializer),
            Self::State { state } => Frame {
                kind,
                data: StateRef { state },
            }
            .serialize(serializer),
            Self::RequestState | Self::Ping | Self::Pong => Frame {
                kind,
                data: Empty {},
            }
            .serialize(serializer),
            Self::Unknown { data, .. } => Frame { kind, data }.serialize(serializer),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
