//! Field-level differences between two snapshots.
//!
//! [`diff`] walks two snapshot trees key by key. Nested mappings are
//! recursed into and reported with dotted paths; sequences and primitives are
//! leaves, so a reordered list shows up as one whole-value change rather than
//! a series of element moves.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::{Object, Value};

/// Differences keyed by dotted field path.
pub type DiffMap = BTreeMap<String, DiffEntry>;

/// How a field changed between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The field exists only in the later snapshot.
    Added,
    /// The field exists only in the earlier snapshot.
    Removed,
    /// The field exists in both with different values.
    Changed,
}

/// One field-level difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    /// Dotted path of the field, e.g. `airplane.label`.
    pub field_path: String,
    /// Value before the change; absent when the field was added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    /// Value after the change; absent when the field was removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
}

impl DiffEntry {
    /// Classify the entry by which sides are present.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match (&self.from, &self.to) {
            (Some(_), None) => ChangeKind::Removed,
            (None, Some(_)) => ChangeKind::Added,
            _ => ChangeKind::Changed,
        }
    }
}

/// Compute the field-level differences from `from` to `to`.
///
/// Missing and null snapshots count as empty mappings. A top-level value
/// that is not a mapping is compared as a single leaf and, when it differs,
/// reported under the empty path.
#[must_use]
pub fn diff(from: Option<&Value>, to: Option<&Value>) -> DiffMap {
    let mut out = DiffMap::new();
    let from = from.filter(|v| !v.is_null());
    let to = to.filter(|v| !v.is_null());

    let empty = Object::new();
    match (root_object(from, &empty), root_object(to, &empty)) {
        (Some(a), Some(b)) => diff_objects(a, b, "", &mut out),
        _ => {
            if from != to {
                insert(&mut out, String::new(), from.cloned(), to.cloned());
            }
        }
    }
    out
}

/// The mapping to walk for one side, or `None` when the side is a leaf.
fn root_object<'a>(value: Option<&'a Value>, empty: &'a Object) -> Option<&'a Object> {
    match value {
        None => Some(empty),
        Some(v) => v.as_object(),
    }
}

fn diff_objects(from: &Object, to: &Object, prefix: &str, out: &mut DiffMap) {
    for (key, from_val) in from {
        if !to.contains_key(key) {
            insert(out, join(prefix, key), Some(from_val.clone()), None);
        }
    }

    for (key, to_val) in to {
        let path = join(prefix, key);
        match from.get(key) {
            None => insert(out, path, None, Some(to_val.clone())),
            Some(from_val) if from_val == to_val => {}
            Some(Value::Object(from_map)) if to_val.is_object() => {
                if let Value::Object(to_map) = to_val {
                    diff_objects(from_map, to_map, &path, out);
                }
            }
            Some(from_val) => insert(out, path, Some(from_val.clone()), Some(to_val.clone())),
        }
    }
}

fn insert(out: &mut DiffMap, field_path: String, from: Option<Value>, to: Option<Value>) {
    out.insert(
        field_path.clone(),
        DiffEntry {
            field_path,
            from,
            to,
        },
    );
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
