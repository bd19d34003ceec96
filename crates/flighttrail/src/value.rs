//! Structured snapshot values.
//!
//! A [`Value`] is the full captured state of one record at one point in time:
//! a tree of mappings, sequences, dates and primitives. Snapshots travel as
//! JSON, with dates in the extended-JSON form `{"$date": <millis>}`.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as Json};

/// Key marking an extended-JSON date object.
pub const DATE_KEY: &str = "$date";

/// A string-keyed mapping of snapshot values.
pub type Object = BTreeMap<String, Value>;

/// A snapshot value.
///
/// Equality is structural, except that numbers compare by value: `Int(2)`
/// equals `Float(2.0)`, since JSON has a single number type.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Explicit null.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Non-integral number.
    Float(f64),
    /// Text.
    String(String),
    /// Point in time.
    Date(DateTime<Utc>),
    /// Ordered sequence, compared and replaced as a whole.
    Array(Vec<Value>),
    /// Nested mapping.
    Object(Object),
}

impl Value {
    /// Short name of the variant, for logs and error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Check if this is the null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this is a nested mapping.
    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Check if the value carries nothing worth displaying.
    ///
    /// Null, the empty string, and empty sequences or mappings are empty.
    /// `false` and `0` are values, not absences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::Array(items) => items.is_empty(),
            Self::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Borrow the inner mapping, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Mutably borrow the inner mapping, if this is an object.
    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the inner text, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a field of an object value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Convert to JSON, encoding dates as `{"$date": <millis>}`.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(n) => Json::Number(Number::from(*n)),
            Self::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::String(s) => Json::String(s.clone()),
            Self::Date(d) => {
                let mut map = Map::new();
                map.insert(
                    DATE_KEY.to_string(),
                    Json::Number(Number::from(d.timestamp_millis())),
                );
                Json::Object(map)
            }
            Self::Array(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(i), Self::Float(f)) | (Self::Float(f), Self::Int(i)) => {
                int_equals_float(*i, *f)
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Exact comparison of an integer with a float; `2 == 2.0`, `2 != 2.5`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::float_cmp)]
fn int_equals_float(i: i64, f: f64) -> bool {
    f.fract() == 0.0 && f as i64 == i && i as f64 == f
}

/// Decode an extended-JSON `$date` payload.
fn decode_date(raw: &Json) -> Option<DateTime<Utc>> {
    match raw {
        Json::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Json::Object(map) => {
                if map.len() == 1 {
                    if let Some(date) = map.get(DATE_KEY).and_then(decode_date) {
                        return Self::Date(date);
                    }
                }
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Object> for Value {
    fn from(map: Object) -> Self {
        Self::Object(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Json::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_primitives() {
        assert_eq!(Value::from(json!(null)), Value::Null);
        assert_eq!(Value::from(json!(true)), Value::Bool(true));
        assert_eq!(Value::from(json!(42)), Value::Int(42));
        assert_eq!(Value::from(json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from(json!("N123")), Value::from("N123"));
    }

    #[test]
    fn test_from_json_date_millis() {
        let value = Value::from(json!({"$date": 1_700_000_000_000_i64}));
        let expected = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(value, Value::Date(expected));
    }

    #[test]
    fn test_from_json_date_string() {
        let value = Value::from(json!({"$date": "2024-03-12T10:00:00Z"}));
        assert!(matches!(value, Value::Date(_)));
    }

    #[test]
    fn test_date_key_with_siblings_is_plain_object() {
        let value = Value::from(json!({"$date": 1, "label": "x"}));
        assert!(value.is_object());
    }

    #[test]
    fn test_unparseable_date_is_plain_object() {
        let value = Value::from(json!({"$date": "not a date"}));
        assert_eq!(value.get(DATE_KEY), Some(&Value::from("not a date")));
    }

    #[test]
    fn test_to_json_encodes_dates() {
        let date = Utc.timestamp_millis_opt(1_000).unwrap();
        let value = Value::Array(vec![Value::Date(date), Value::Int(3)]);
        assert_eq!(value.to_json(), json!([{"$date": 1000}, 3]));
    }

    #[test]
    fn test_nested_json_survives_conversion() {
        let raw = json!({
            "name": "N123",
            "airplane": {"_id": "a1", "label": "PR-ABC"},
            "passengers": ["Ana", "Bruno"],
            "departure": {"$date": 1_710_237_600_000_i64},
        });
        let value = Value::from(raw.clone());
        assert_eq!(value.to_json(), raw);
    }

    #[test]
    fn test_is_empty() {
        assert!(Value::Null.is_empty());
        assert!(Value::from("").is_empty());
        assert!(Value::Array(Vec::new()).is_empty());
        assert!(Value::Object(Object::new()).is_empty());
        assert!(!Value::Bool(false).is_empty());
        assert!(!Value::Int(0).is_empty());
        assert!(!Value::from("x").is_empty());
    }

    #[test]
    fn test_get_on_non_object() {
        assert!(Value::Int(1).get("a").is_none());
        let value = Value::from(json!({"a": 1}));
        assert_eq!(value.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(json!([])).type_name(), "array");
        assert_eq!(Value::from(json!({})).type_name(), "object");
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert_eq!(Value::from(json!(2)), Value::from(json!(2.0)));
        assert_eq!(Value::Float(-3.0), Value::Int(-3));
        assert_ne!(Value::Int(2), Value::Float(2.5));
        assert_ne!(Value::Int(i64::MAX), Value::Float(9.3e18));
        assert_ne!(Value::Int(1), Value::from("1"));
        assert_eq!(
            Value::from(json!({"seats": [1, 2]})),
            Value::from(json!({"seats": [1.0, 2.0]}))
        );
    }

    #[test]
    fn test_serde_uses_json_form() {
        let value: Value = serde_json::from_str(r#"{"at": {"$date": 0}}"#).unwrap();
        assert!(matches!(value.get("at"), Some(Value::Date(_))));
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"at":{"$date":0}}"#);
    }
}
