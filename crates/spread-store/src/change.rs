//! Change notifications.

use std::fmt;

use spread_protocol::{Path, Value};

/// What kind of mutation happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// A value was written at a path.
    Set,
    /// A path was removed.
    Delete,
    /// The whole tree was emptied locally.
    Clear,
    /// The whole tree was replaced by a peer's snapshot.
    StateSync,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => write!(f, "set"),
            Self::Delete => write!(f, "delete"),
            Self::Clear => write!(f, "clear"),
            Self::StateSync => write!(f, "state_sync"),
        }
    }
}

/// Where a mutation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A call on this store.
    Local,
    /// A message from a peer.
    Remote,
}

/// One notification delivered to `on_change` handlers.
///
/// | operation   | path        | value                 |
/// |-------------|-------------|-----------------------|
/// | `Set`       | `Some(..)`  | `Some(new value)`     |
/// | `Delete`    | `Some(..)`  | removed value, if any |
/// | `Clear`     | `None`      | `None`                |
/// | `StateSync` | `None`      | `Some(new root)`      |
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub operation: Operation,
    pub path: Option<Path>,
    pub value: Option<Value>,
    pub origin: Origin,
}

impl ChangeEvent {
    pub(crate) fn set(path: Path, value: Value, origin: Origin) -> Self {
        Self {
            operation: Operation::Set,
            path: Some(path),
            value: Some(value),
            origin,
        }
    }

    pub(crate) fn delete(path: Path, removed: Option<Value>, origin: Origin) -> Self {
        Self {
            operation: Operation::Delete,
            path: Some(path),
            value: removed,
            origin,
        }
    }

    pub(crate) fn clear() -> Self {
        Self {
            operation: Operation::Clear,
            path: None,
            value: None,
            origin: Origin::Local,
        }
    }

    pub(crate) fn state_sync(state: Value) -> Self {
        Self {
            operation: Operation::StateSync,
            path: None,
            value: Some(state),
            origin: Origin::Remote,
        }
    }
}
