//! Display formatting for timeline rows.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::config::DisplayConfig;
use crate::error::{Error, Result};
use crate::value::Value;

/// Default date format, `DD/MM HH:mm`.
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m %H:%M";

/// Separator between array elements.
pub const ARRAY_SEPARATOR: &str = " | ";

/// Field whose value stands in for a whole nested object.
pub const LABEL_FIELD: &str = "label";

/// Turns snapshot values into display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    date_format: String,
    offset: FixedOffset,
    yes_label: String,
    no_label: String,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            offset: Utc.fix(),
            yes_label: "Yes".to_string(),
            no_label: "No".to_string(),
        }
    }
}

/// Check that a strftime format string is usable.
///
/// # Errors
///
/// Returns a validation error if the format has an unknown or malformed
/// specifier.
pub fn check_date_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(Error::ConfigValidation {
            message: format!("invalid date_format: {format}"),
        });
    }
    Ok(())
}

impl Formatter {
    /// Build a formatter from display settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the date format is invalid or the UTC offset is
    /// out of range.
    pub fn from_config(config: &DisplayConfig) -> Result<Self> {
        check_date_format(&config.date_format)?;

        let offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| Error::ConfigValidation {
                message: format!(
                    "utc_offset_minutes ({}) is out of range",
                    config.utc_offset_minutes
                ),
            })?;

        Ok(Self {
            date_format: config.date_format.clone(),
            offset,
            yes_label: config.yes_label.clone(),
            no_label: config.no_label.clone(),
        })
    }

    /// Format a value for display.
    #[must_use]
    pub fn display(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Bool(true) => self.yes_label.clone(),
            Value::Bool(false) => self.no_label.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Date(d) => self.timestamp(*d),
            Value::Array(items) => items
                .iter()
                .map(|item| self.display(item))
                .collect::<Vec<_>>()
                .join(ARRAY_SEPARATOR),
            Value::Object(map) => match map.get(LABEL_FIELD) {
                Some(label) => self.display(label),
                None => value.to_json().to_string(),
            },
        }
    }

    /// Format a value, or `None` when there is nothing to show.
    #[must_use]
    pub fn display_non_empty(&self, value: &Value) -> Option<String> {
        if value.is_empty() {
            return None;
        }
        let text = self.display(value);
        (!text.is_empty()).then_some(text)
    }

    /// Format a point in time with the configured date format and offset.
    #[must_use]
    pub fn timestamp(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format(&self.date_format)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_display_primitives() {
        let fmt = Formatter::default();
        assert_eq!(fmt.display(&Value::Null), "");
        assert_eq!(fmt.display(&Value::Int(7)), "7");
        assert_eq!(fmt.display(&Value::Float(2.5)), "2.5");
        assert_eq!(fmt.display(&v(json!("GRU"))), "GRU");
    }

    #[test]
    fn test_display_booleans() {
        let fmt = Formatter::default();
        assert_eq!(fmt.display(&Value::Bool(true)), "Yes");
        assert_eq!(fmt.display(&Value::Bool(false)), "No");
    }

    #[test]
    fn test_display_localized_booleans() {
        let config = DisplayConfig {
            yes_label: "Sim".to_string(),
            no_label: "Não".to_string(),
            ..DisplayConfig::default()
        };
        let fmt = Formatter::from_config(&config).unwrap();
        assert_eq!(fmt.display(&Value::Bool(true)), "Sim");
        assert_eq!(fmt.display(&Value::Bool(false)), "Não");
    }

    #[test]
    fn test_display_date() {
        let fmt = Formatter::default();
        let at = Utc.with_ymd_and_hms(2024, 3, 12, 9, 5, 0).unwrap();
        assert_eq!(fmt.display(&Value::Date(at)), "12/03 09:05");
    }

    #[test]
    fn test_display_date_with_offset() {
        let config = DisplayConfig {
            utc_offset_minutes: -180,
            ..DisplayConfig::default()
        };
        let fmt = Formatter::from_config(&config).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 12, 1, 30, 0).unwrap();
        assert_eq!(fmt.timestamp(at), "11/03 22:30");
    }

    #[test]
    fn test_display_label_object() {
        let fmt = Formatter::default();
        let airplane = v(json!({"_id": "a1", "label": "PR-ABC"}));
        assert_eq!(fmt.display(&airplane), "PR-ABC");
    }

    #[test]
    fn test_display_plain_object_as_json() {
        let fmt = Formatter::default();
        assert_eq!(fmt.display(&v(json!({"a": 1}))), r#"{"a":1}"#);
    }

    #[test]
    fn test_display_array_joined() {
        let fmt = Formatter::default();
        let passengers = v(json!(["Ana", {"label": "Bruno"}, true]));
        assert_eq!(fmt.display(&passengers), "Ana | Bruno | Yes");
    }

    #[test]
    fn test_display_non_empty() {
        let fmt = Formatter::default();
        assert_eq!(fmt.display_non_empty(&Value::Null), None);
        assert_eq!(fmt.display_non_empty(&v(json!(""))), None);
        assert_eq!(fmt.display_non_empty(&v(json!([]))), None);
        assert_eq!(fmt.display_non_empty(&v(json!({"label": ""}))), None);
        assert_eq!(
            fmt.display_non_empty(&Value::Bool(false)),
            Some("No".to_string())
        );
    }

    #[test]
    fn test_invalid_date_format_is_rejected() {
        let config = DisplayConfig {
            date_format: "%d/%m %Q".to_string(),
            ..DisplayConfig::default()
        };
        let err = Formatter::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
        assert!(err.to_string().contains("%Q"));

        assert!(check_date_format(DEFAULT_DATE_FORMAT).is_ok());
        assert!(check_date_format("%Y-%m-%d %").is_err());
    }

    #[test]
    fn test_offset_out_of_range() {
        let config = DisplayConfig {
            utc_offset_minutes: 24 * 60,
            ..DisplayConfig::default()
        };
        let err = Formatter::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("utc_offset_minutes"));
    }
}
