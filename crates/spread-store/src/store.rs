//! The replicated store.
//!
//! A [`Store`] holds one root mapping. Local calls mutate it and broadcast
//! a message describing the mutation; messages from peers mutate it
//! without re-broadcasting. Either way, change handlers hear about it.
//!
//! # Locking
//!
//! Every mutation, local or remote, runs under the same lock:
//!
//! ```text
//! lock ─→ (local only) hand message to connection ─→ mutate tree ─→ unlock ─→ notify
//! ```
//!
//! Broadcasting inside the lock means the order frames leave this client
//! is the order mutations were applied here. Handlers run after the lock
//! is released, so they may read from (or write to) the store freely.
//!
//! A local mutation that can't be handed to the connection is not applied
//! at all, so the tree never holds a change that peers were never told
//! about.
//!
//! # Conflicts
//!
//! None are resolved. If two clients write the same path at once, each
//! peer keeps whichever message it happened to apply last.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use spread_connection::{Connection, HandlerRegistry, MessageSink};
use spread_protocol::{Key, Mapping, Message, Path, Value};
use spread_transport::Transport;

use crate::change::{ChangeEvent, Origin};
use crate::{StoreError, tree};

struct Inner {
    root: Mutex<Mapping>,
    sink: Arc<dyn MessageSink>,
    on_change: HandlerRegistry<ChangeEvent>,
}

/// A nested key/value mapping kept in sync with peers.
///
/// Cheap to clone; clones share the same tree.
///
/// # Example
///
/// ```rust,no_run
/// use spread_connection::{Connection, ConnectionConfig};
/// use spread_store::Store;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = Connection::new("ws://localhost:8080", ConnectionConfig::default());
/// let store = Store::new(&conn);
/// conn.connect().await?;
///
/// store.set_in(["config", "database", "host"], "localhost")?;
/// assert_eq!(
///     store.get_in(["config", "database", "host"]),
///     Some("localhost".into())
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Creates a store bound to `connection` for its whole lifetime.
    ///
    /// Registers a message handler that applies every inbound message.
    /// The handler only holds a weak reference, so dropping every `Store`
    /// clone stops remote application.
    pub fn new<T: Transport>(connection: &Connection<T>) -> Self {
        let store = Self::with_sink(connection.sink());
        let weak: Weak<Inner> = Arc::downgrade(&store.inner);
        connection.on_message(move |message| {
            if let Some(inner) = weak.upgrade() {
                Store { inner }.apply_remote(message);
            }
        });
        store
    }

    /// Creates a store that broadcasts into `sink` but receives nothing.
    pub fn with_sink(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                root: Mutex::new(Mapping::new()),
                sink,
                on_change: HandlerRegistry::new("change"),
            }),
        }
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// The value at top-level `key`, if set.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        let key = key.into();
        self.inner.root.lock().get(key.as_str()).cloned()
    }

    /// The value at `path`. `None` as soon as a segment is missing or an
    /// intermediate value isn't a mapping (or the path is empty).
    pub fn get_in<I, K>(&self, path: I) -> Option<Value>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let path = Path::new(path).ok()?;
        tree::get(&self.inner.root.lock(), path.segments()).cloned()
    }

    /// `true` if top-level `key` is set.
    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        self.inner.root.lock().contains_key(key.as_str())
    }

    /// Top-level keys.
    pub fn keys(&self) -> Vec<String> {
        self.inner.root.lock().keys().cloned().collect()
    }

    /// Top-level values.
    pub fn values(&self) -> Vec<Value> {
        self.inner.root.lock().values().cloned().collect()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.inner.root.lock().len()
    }

    /// `true` if the root mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.root.lock().is_empty()
    }

    /// A copy of the whole tree.
    pub fn to_mapping(&self) -> Mapping {
        self.inner.root.lock().clone()
    }

    /// Alias of [`to_mapping`](Self::to_mapping).
    pub fn state(&self) -> Mapping {
        self.to_mapping()
    }

    /// Iterates over a snapshot of the top-level entries.
    pub fn iter(&self) -> serde_json::map::IntoIter {
        self.to_mapping().into_iter()
    }

    // -----------------------------------------------------------------
    // Local mutations
    // -----------------------------------------------------------------

    /// Writes `value` at top-level `key` and broadcasts it.
    ///
    /// # Errors
    /// [`StoreError::Synchronization`] if the message couldn't be handed to
    /// the connection; the store is left unchanged.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<(), StoreError> {
        self.write(Path::single(key), value.into())
    }

    /// Removes top-level `key` and broadcasts the removal. Returns the
    /// removed value, if there was one.
    ///
    /// # Errors
    /// [`StoreError::Synchronization`], as for [`set`](Self::set).
    pub fn delete(&self, key: impl Into<Key>) -> Result<Option<Value>, StoreError> {
        self.remove(Path::single(key))
    }

    /// Writes `value` at `path`, turning every intermediate segment into a
    /// mapping (replacing whatever non-mapping was there), and broadcasts
    /// the full path.
    ///
    /// # Errors
    /// - [`StoreError::InvalidPath`] for an empty path.
    /// - [`StoreError::Synchronization`], as for [`set`](Self::set).
    pub fn set_in<I, K>(&self, path: I, value: impl Into<Value>) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.write(Path::new(path)?, value.into())
    }

    /// Removes the leaf of `path` and broadcasts the removal.
    ///
    /// If the parent of a multi-segment path doesn't resolve to a mapping,
    /// nothing happens: `Ok(None)`, and no message is sent.
    ///
    /// # Errors
    /// As for [`set_in`](Self::set_in).
    pub fn delete_in<I, K>(&self, path: I) -> Result<Option<Value>, StoreError>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.remove(Path::new(path)?)
    }

    /// Empties the tree. Local only: peers are NOT told.
    pub fn clear(&self) {
        self.inner.root.lock().clear();
        tracing::debug!("store cleared locally");
        self.notify(ChangeEvent::clear());
    }

    /// Asks peers for their full state. Doesn't wait for the reply; it
    /// arrives later as a `state` message.
    ///
    /// # Errors
    /// [`StoreError::Synchronization`] if the request couldn't be sent.
    pub fn request_state(&self) -> Result<(), StoreError> {
        self.broadcast(&Message::request_state())
    }

    /// Registers a handler for every local or remote mutation.
    ///
    /// A handler that panics is logged and skipped; the others still run.
    pub fn on_change<F>(&self, handler: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.inner.on_change.register(handler);
    }

    fn write(&self, path: Path, value: Value) -> Result<(), StoreError> {
        {
            let mut root = self.inner.root.lock();
            self.broadcast(&Message::set(path.clone(), value.clone()))?;
            tree::insert(&mut root, &path, value.clone());
        }
        self.notify(ChangeEvent::set(path, value, Origin::Local));
        Ok(())
    }

    fn remove(&self, path: Path) -> Result<Option<Value>, StoreError> {
        let removed = {
            let mut root = self.inner.root.lock();
            if tree::parent(&root, &path).is_none() {
                return Ok(None);
            }
            self.broadcast(&Message::delete(path.clone()))?;
            tree::remove(&mut root, &path)
        };
        self.notify(ChangeEvent::delete(path, removed.clone(), Origin::Local));
        Ok(removed)
    }

    fn broadcast(&self, message: &Message) -> Result<(), StoreError> {
        self.inner
            .sink
            .send(message)
            .map_err(|source| StoreError::Synchronization {
                kind: message.kind().to_string(),
                source,
            })
    }

    fn notify(&self, event: ChangeEvent) {
        self.inner.on_change.emit(&event);
    }

    // -----------------------------------------------------------------
    // Remote application
    // -----------------------------------------------------------------

    /// Applies one inbound message. Never re-broadcasts a mutation.
    pub(crate) fn apply_remote(&self, message: &Message) {
        match message {
            Message::Set { path, value } => {
                tree::insert(&mut self.inner.root.lock(), path, value.clone());
                tracing::debug!(%path, "applied remote set");
                self.notify(ChangeEvent::set(path.clone(), value.clone(), Origin::Remote));
            }
            Message::Delete { path } => {
                let removed = tree::remove(&mut self.inner.root.lock(), path);
                tracing::debug!(%path, "applied remote delete");
                self.notify(ChangeEvent::delete(path.clone(), removed, Origin::Remote));
            }
            Message::State { state } => {
                *self.inner.root.lock() = state.clone();
                tracing::debug!(keys = state.len(), "replaced state from peer");
                self.notify(ChangeEvent::state_sync(Value::Object(state.clone())));
            }
            Message::RequestState => {
                let snapshot = self.to_mapping();
                if let Err(e) = self.inner.sink.send(&Message::state(snapshot)) {
                    tracing::warn!(error = %e, "failed to answer state request");
                }
            }
            Message::Ping => {
                if let Err(e) = self.inner.sink.send(&Message::pong()) {
                    tracing::warn!(error = %e, "failed to answer ping");
                }
            }
            Message::Pong => {}
            Message::Unknown { kind, .. } => {
                tracing::debug!(kind = %kind, "ignoring unknown message kind");
            }
        }
    }
}

impl<'a> IntoIterator for &'a Store {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &*self.inner.root.lock())
            .finish()
    }
}
