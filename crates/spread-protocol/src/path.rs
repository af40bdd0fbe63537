//! Keys and paths: how a location in the replicated tree is addressed.
//!
//! Every key is normalized to its string form before it is stored or
//! compared. Two keys that stringify the same way ARE the same key, so
//! `Key::from(1)` and `Key::from("1")` address the same slot.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{ProtocolError, Value};

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// A normalized key into a [`Mapping`](crate::Mapping).
///
/// Newtype wrapper over `String`. Anything scalar (string slices, integers,
/// booleans, chars) converts into a `Key` through `From`, so call sites can
/// write `store.set("name", ..)` or `store.set(42, ..)` alike.
///
/// `#[serde(transparent)]` makes a key serialize as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// Returns the key's string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key, returning the underlying `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl From<&Key> for Key {
    fn from(k: &Key) -> Self {
        k.clone()
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Self(c.to_string())
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Self(b.to_string())
    }
}

macro_rules! key_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Key {
                fn from(n: $t) -> Self {
                    Self(n.to_string())
                }
            }
        )*
    };
}

key_from_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Peers are expected to send path segments as strings, but numbers and
/// booleans are normalized the same way local keys are.
impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(Self(s)),
            Value::Number(n) => Ok(Self(n.to_string())),
            Value::Bool(b) => Ok(Self(b.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "path segment must be a scalar, got {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Path
// ---------------------------------------------------------------------------

/// An ordered, non-empty sequence of [`Key`]s.
///
/// ```text
/// ["config", "database", "host"]
///  └──── parent() ────┘  └leaf┘
/// ```
///
/// The parent segments address the containing mapping; the leaf is the key
/// written or removed inside it. On the wire a path is a JSON array of
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Path(Vec<Key>);

impl Path {
    /// Builds a path from any sequence of key-like segments.
    ///
    /// # Errors
    /// Returns [`ProtocolError::EmptyPath`] if `segments` yields nothing.
    pub fn new<I, K>(segments: I) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let keys: Vec<Key> = segments.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(ProtocolError::EmptyPath);
        }
        Ok(Self(keys))
    }

    /// A path with exactly one segment: a top-level key.
    pub fn single(key: impl Into<Key>) -> Self {
        Self(vec![key.into()])
    }

    /// All segments, in order.
    pub fn segments(&self) -> &[Key] {
        &self.0
    }

    /// Every segment except the last.
    pub fn parent(&self) -> &[Key] {
        &self.0[..self.0.len() - 1]
    }

    /// The last segment.
    pub fn leaf(&self) -> &Key {
        // Non-empty by construction.
        &self.0[self.0.len() - 1]
    }

    /// Number of segments (always at least one).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` when the path addresses a top-level key.
    pub fn is_single(&self) -> bool {
        self.0.len() == 1
    }

    /// Iterates over the segments.
    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.0.iter()
    }
}

impl From<Key> for Path {
    fn from(key: Key) -> Self {
        Self(vec![key])
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Displays as dot-separated segments: `config.database.host`.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(key.as_str())?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Self, D::Error> {
        let keys = Vec::<Key>::deserialize(deserializer)?;
        Self::new(keys).map_err(serde::de::Error::custom)
    }
}
