//! Wire protocol for Spread.
//!
//! This crate defines the "language" that replicating peers speak:
//!
//! - **Data model** ([`Key`], [`Path`], [`Value`], [`Mapping`]): how a
//!   location in the shared tree is addressed and what can be stored there.
//! - **Messages** ([`Message`]): the six frame kinds that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages are
//!   converted to/from text frames.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw text frames) and the
//! store (the replicated tree). It doesn't know about sockets or handlers.
//!
//! ```text
//! Transport (text) → Protocol (Message) → Store (Mapping)
//! ```

mod codec;
mod error;
mod message;
mod path;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use message::Message;
pub use path::{Key, Path};

/// A structured value: null, boolean, number, string, sequence, or mapping.
///
/// This is `serde_json::Value`, a tagged union that already covers every
/// shape the wire can carry, so the codec never guesses at types.
pub use serde_json::Value;

/// Builds a [`Value`] from JSON-like literal syntax.
pub use serde_json::json;

/// A mapping from string keys to [`Value`]s. The replicated root is one.
pub type Mapping = serde_json::Map<String, Value>;
