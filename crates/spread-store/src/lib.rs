//! Replicated key/value store for Spread.
//!
//! A [`Store`] is a nested mapping addressed by paths. Local writes are
//! broadcast to peers through the connection; peers' writes arrive as
//! messages and are applied without echoing them back.
//!
//! # Key types
//!
//! - [`Store`]: the replicated tree and its path operations
//! - [`ChangeEvent`]: what `on_change` handlers receive
//! - [`Operation`] / [`Origin`]: what changed, and who changed it
//! - [`StoreError`]: broadcast failures and invalid paths

mod change;
mod error;
mod store;
mod tree;

pub use change::{ChangeEvent, Operation, Origin};
pub use error::StoreError;
pub use store::Store;
