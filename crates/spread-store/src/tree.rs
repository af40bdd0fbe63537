//! Path walking over the nested mapping.
//!
//! These are pure functions over `&Mapping` / `&mut Mapping`; locking and
//! broadcasting are the store's job.

use spread_protocol::{Key, Mapping, Path, Value};

/// Follows `segments` from `root`. `None` as soon as a segment is missing
/// or an intermediate value is not a mapping.
pub(crate) fn get<'a>(root: &'a Mapping, segments: &[Key]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = root.get(first.as_str())?;
    for key in rest {
        current = current.as_object()?.get(key.as_str())?;
    }
    Some(current)
}

/// Resolves the mapping that holds `path`'s leaf, if it exists.
pub(crate) fn parent<'a>(root: &'a Mapping, path: &Path) -> Option<&'a Mapping> {
    if path.is_single() {
        return Some(root);
    }
    get(root, path.parent())?.as_object()
}

fn parent_mut<'a>(root: &'a mut Mapping, segments: &[Key]) -> Option<&'a mut Mapping> {
    let mut current = root;
    for key in segments {
        current = current.get_mut(key.as_str())?.as_object_mut()?;
    }
    Some(current)
}

/// Walks `segments`, making each one a mapping. Missing segments are
/// created; segments holding anything else are overwritten, so every
/// step yields a mapping.
fn ensure_mapping<'a>(root: &'a mut Mapping, segments: &[Key]) -> Option<&'a mut Mapping> {
    let mut current = root;
    for key in segments {
        let slot = current.entry(key.as_str()).or_insert(Value::Null);
        if !slot.is_object() {
            *slot = Value::Object(Mapping::new());
        }
        current = slot.as_object_mut()?;
    }
    Some(current)
}

/// Writes `value` at `path`, creating intermediate mappings as needed.
/// Returns the previous value at the leaf.
pub(crate) fn insert(root: &mut Mapping, path: &Path, value: Value) -> Option<Value> {
    ensure_mapping(root, path.parent())?.insert(path.leaf().to_string(), value)
}

/// Removes the leaf of `path`. `None` if the parent isn't a mapping or the
/// leaf wasn't there.
pub(crate) fn remove(root: &mut Mapping, path: &Path) -> Option<Value> {
    parent_mut(root, path.parent())?.remove(path.leaf().as_str())
}
