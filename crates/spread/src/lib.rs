//! # Spread
//!
//! Client for a peer-replicated key/value store.
//!
//! Every client connects to a relay that rebroadcasts frames to every other
//! client. Each client keeps a full copy of a nested mapping; writes made on
//! one copy travel through the relay and are applied on all the others.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spread::prelude::*;
//!
//! # async fn run() -> Result<(), SpreadError> {
//! spread::logging::init();
//!
//! let client = spread::connect("ws://localhost:8080").await?;
//! client.store().on_change(|change| println!("{} {:?}", change.operation, change.path));
//! client.store().set_in(["config", "database", "host"], "localhost")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! | crate | role |
//! |---|---|
//! | `spread-protocol` | message kinds, paths, JSON codec |
//! | `spread-transport` | `Transport`/`Link` traits, WebSocket dialer |
//! | `spread-connection` | lifecycle, handlers, reconnect |
//! | `spread-store` | the replicated tree |

mod client;
mod config;
mod error;
pub mod logging;

pub use client::{SpreadClient, SpreadClientBuilder};
pub use config::ClientConfig;
pub use error::{ErrorKind, SpreadError};

pub use spread_connection::{
    CloseEvent, Connection, ConnectionConfig, ConnectionError, ConnectionState,
};
pub use spread_protocol::{Key, Mapping, Message, Path, ProtocolError, Value, json};
pub use spread_store::{ChangeEvent, Operation, Origin, Store, StoreError};
pub use spread_transport::{Transport, TransportError, WebSocketTransport};

/// Connects to `url` with the default configuration.
///
/// # Errors
/// See [`SpreadClientBuilder::connect`].
pub async fn connect(url: impl Into<String>) -> Result<SpreadClient, SpreadError> {
    SpreadClient::builder().connect(url).await
}

/// Everything most applications need, in one import.
pub mod prelude {
    pub use crate::{
        ChangeEvent, ClientConfig, CloseEvent, ErrorKind, Operation, Origin, SpreadClient,
        SpreadClientBuilder, SpreadError, Store, Value, json,
    };
}
