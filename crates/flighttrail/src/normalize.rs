//! Snapshot normalization applied before diffing.
//!
//! Some fields hold collections whose order carries no meaning, such as the
//! cost-center/requester pairs or the passenger list of a flight. Diffing them
//! raw would report a change every time the list is reordered. A
//! [`Normalizer`] projects each snapshot into a comparable shape first.

use serde::{Deserialize, Serialize};

use crate::format::{Formatter, LABEL_FIELD};
use crate::value::{Object, Value};

/// Separator between the parts of one collapsed element.
pub const PART_SEPARATOR: &str = " - ";

/// Separator between collapsed elements.
pub const ELEMENT_SEPARATOR: &str = ", ";

/// A pure projection from snapshot to snapshot.
pub trait Normalizer: Send + Sync {
    /// Return the normalized form of `snapshot`.
    fn normalize(&self, snapshot: &Value) -> Value;
}

impl<F> Normalizer for F
where
    F: Fn(&Value) -> Value + Send + Sync,
{
    fn normalize(&self, snapshot: &Value) -> Value {
        self(snapshot)
    }
}

/// Leaves snapshots untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Normalizer for Identity {
    fn normalize(&self, snapshot: &Value) -> Value {
        snapshot.clone()
    }
}

/// Collapse one list field into a sorted, joined string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapseRule {
    /// Dotted path of the list field.
    pub field: String,
    /// Keys read from each object element, joined with `" - "`.
    /// When empty, an object element is reduced to its `label`.
    #[serde(default)]
    pub keys: Vec<String>,
}

impl CollapseRule {
    /// Create a rule for `field` reading the given keys.
    #[must_use]
    pub fn new(field: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            field: field.into(),
            keys: keys.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Normalizer that applies a set of [`CollapseRule`]s.
#[derive(Debug, Clone, Default)]
pub struct CollapseLists {
    rules: Vec<CollapseRule>,
    formatter: Formatter,
}

impl CollapseLists {
    /// Create a normalizer from rules, formatting element parts with `formatter`.
    #[must_use]
    pub fn new(rules: Vec<CollapseRule>, formatter: Formatter) -> Self {
        Self { rules, formatter }
    }

    /// The rules in effect.
    #[must_use]
    pub fn rules(&self) -> &[CollapseRule] {
        &self.rules
    }

    fn collapse(&self, rule: &CollapseRule, items: &[Value]) -> Value {
        let mut parts: Vec<String> = items
            .iter()
            .map(|item| self.element_text(rule, item))
            .filter(|text| !text.is_empty())
            .collect();
        parts.sort();
        Value::String(parts.join(ELEMENT_SEPARATOR))
    }

    fn element_text(&self, rule: &CollapseRule, item: &Value) -> String {
        match item {
            Value::String(s) => s.clone(),
            Value::Object(map) if rule.keys.is_empty() => map.get(LABEL_FIELD).map_or_else(
                || self.formatter.display(item),
                |label| self.formatter.display(label),
            ),
            Value::Object(map) => rule
                .keys
                .iter()
                .filter_map(|key| map.get(key))
                .filter_map(|part| self.formatter.display_non_empty(part))
                .collect::<Vec<_>>()
                .join(PART_SEPARATOR),
            other => self.formatter.display(other),
        }
    }

    fn apply(&self, rule: &CollapseRule, map: &mut Object, segments: &[&str]) {
        match segments {
            [] => {}
            [last] => {
                if let Some(Value::Array(items)) = map.get(*last) {
                    let collapsed = self.collapse(rule, items);
                    map.insert((*last).to_string(), collapsed);
                }
            }
            [head, rest @ ..] => {
                if let Some(Value::Object(inner)) = map.get_mut(*head) {
                    self.apply(rule, inner, rest);
                }
            }
        }
    }
}

impl Normalizer for CollapseLists {
    fn normalize(&self, snapshot: &Value) -> Value {
        let mut out = snapshot.clone();
        for rule in &self.rules {
            if let Some(map) = out.as_object_mut() {
                let segments: Vec<&str> = rule.field.split('.').collect();
                self.apply(rule, map, &segments);
            }
        }
        out
    }
}
