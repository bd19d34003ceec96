//! Configuration management for flighttrail.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Duration;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::{check_date_format, DEFAULT_DATE_FORMAT};
use crate::normalize::CollapseRule;
use crate::titles::{FieldTitle, FieldTitleMap, MatchMode};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flighttrail";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "audit.db";

/// Largest accepted UTC offset, in minutes (exclusive).
const MAX_OFFSET_MINUTES: u32 = 24 * 60;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTTRAIL_`, `__` between sections)
/// 2. TOML config file at `~/.config/flighttrail/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Display configuration.
    pub display: DisplayConfig,
    /// Timeline configuration.
    pub timeline: TimelineConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the audit log database.
    /// Defaults to `~/.local/share/flighttrail/audit.db`
    pub database_path: Option<PathBuf>,
    /// Retention for audit entries in days.
    /// Set to 0 to keep entries forever.
    pub max_age_days: u32,
}

/// How values are rendered in timelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// strftime format for dates.
    pub date_format: String,
    /// Offset from UTC, in minutes, used when showing dates.
    pub utc_offset_minutes: i32,
    /// Text shown for `true`.
    pub yes_label: String,
    /// Text shown for `false`.
    pub no_label: String,
}

/// Which fields appear in timelines and how lists are compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// How field keys match nested paths.
    pub match_mode: MatchMode,
    /// Tracked fields and their labels, in display order.
    pub fields: Vec<FieldTitle>,
    /// List fields collapsed into sorted strings before diffing.
    pub collapse: Vec<CollapseRule>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            max_age_days: 0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            utc_offset_minutes: 0,
            yes_label: "Yes".to_string(),
            no_label: "No".to_string(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::Substring,
            fields: default_flight_fields(),
            collapse: default_collapse_rules(),
        }
    }
}

/// Default tracked fields for the flights collection.
fn default_flight_fields() -> Vec<FieldTitle> {
    [
        ("name", "Name"),
        ("tailNumber", "Tail Number"),
        ("airplane", "Airplane"),
        ("origin", "Origin"),
        ("destination", "Destination"),
        ("departureDateTime", "Departure"),
        ("arrivalDateTime", "Arrival"),
        ("captain", "Captain"),
        ("firstOfficer", "First Officer"),
        ("flightAttendant", "Flight Attendant"),
        ("passengers", "Passengers"),
        ("requesters", "Requesters"),
        ("status", "Status"),
        ("isDraft", "Draft"),
        ("notes", "Notes"),
    ]
    .into_iter()
    .map(|(path, label)| FieldTitle::new(path, label))
    .collect()
}

/// Default list collapsing for the flights collection.
fn default_collapse_rules() -> Vec<CollapseRule> {
    vec![
        CollapseRule::new("requesters", &["costCenter", "requester"]),
        CollapseRule::new("passengers", &[]),
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FLIGHTTRAIL_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTTRAIL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        // Display
        check_date_format(&self.display.date_format)?;

        if self.display.utc_offset_minutes.unsigned_abs() >= MAX_OFFSET_MINUTES {
            return Err(Error::ConfigValidation {
                message: format!(
                    "utc_offset_minutes ({}) must be within ±{MAX_OFFSET_MINUTES}",
                    self.display.utc_offset_minutes
                ),
            });
        }

        // Timeline fields
        let mut seen = HashSet::new();
        for field in &self.timeline.fields {
            if field.path.is_empty() || field.label.is_empty() {
                return Err(Error::ConfigValidation {
                    message: "timeline fields need a non-empty path and label".to_string(),
                });
            }
            if !seen.insert(field.path.as_str()) {
                return Err(Error::ConfigValidation {
                    message: format!("duplicate timeline field path: {}", field.path),
                });
            }
        }

        if self.timeline.collapse.iter().any(|rule| rule.field.is_empty()) {
            return Err(Error::ConfigValidation {
                message: "collapse rules need a non-empty field".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the retention period, or `None` when entries are kept forever.
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        retention(self.storage.max_age_days)
    }

    /// Build the field title map described by the timeline section.
    #[must_use]
    pub fn field_titles(&self) -> FieldTitleMap {
        FieldTitleMap::from_titles(self.timeline.fields.iter().cloned(), self.timeline.match_mode)
    }
}

/// Retention period for a number of days; `0` keeps entries forever.
#[must_use]
pub fn retention(days: u32) -> Option<Duration> {
    (days > 0).then(|| Duration::days(i64::from(days)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert_eq!(config.timeline.match_mode, MatchMode::Substring);
        assert!(!config.timeline.fields.is_empty());
        assert_eq!(config.display.date_format, "%d/%m %H:%M");
    }

    #[test]
    fn test_default_storage_config() {
        let storage = StorageConfig::default();

        assert!(storage.database_path.is_none());
        assert_eq!(storage.max_age_days, 0);
    }

    #[test]
    fn test_default_display_config() {
        let display = DisplayConfig::default();

        assert_eq!(display.utc_offset_minutes, 0);
        assert_eq!(display.yes_label, "Yes");
        assert_eq!(display.no_label, "No");
    }

    #[test]
    fn test_default_timeline_config() {
        let timeline = TimelineConfig::default();

        assert_eq!(timeline.fields[0], FieldTitle::new("name", "Name"));
        assert!(timeline.collapse.iter().any(|r| r.field == "passengers"));
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_date_format() {
        let mut config = Config::default();
        config.display.date_format = "%d/%m %Q".to_string();

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("date_format"));
    }

    #[test]
    fn test_validate_offset_out_of_range() {
        let mut config = Config::default();
        config.display.utc_offset_minutes = -1440;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("utc_offset_minutes"));
    }

    #[test]
    fn test_validate_duplicate_field() {
        let mut config = Config::default();
        config.timeline.fields.push(FieldTitle::new("name", "Again"));

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("duplicate timeline field path: name"));
    }

    #[test]
    fn test_validate_empty_field_label() {
        let mut config = Config::default();
        config.timeline.fields = vec![FieldTitle::new("name", "")];

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_collapse_field() {
        let mut config = Config::default();
        config.timeline.collapse = vec![CollapseRule::new("", &[])];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("collapse"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("audit.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/audit.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/audit.sqlite")
        );
    }

    #[test]
    fn test_max_age_none_when_zero() {
        let config = Config::default();
        assert!(config.max_age().is_none());
    }

    #[test]
    fn test_max_age_some_when_set() {
        let mut config = Config::default();
        config.storage.max_age_days = 30;

        assert_eq!(config.max_age(), Some(Duration::days(30)));
        assert_eq!(retention(7), Some(Duration::days(7)));
        assert_eq!(retention(0), None);
    }

    #[test]
    fn test_field_titles_follow_config() {
        let mut config = Config::default();
        config.timeline.match_mode = MatchMode::Segment;
        config.timeline.fields = vec![
            FieldTitle::new("origin", "From"),
            FieldTitle::new("destination", "To"),
        ];

        let titles = config.field_titles();
        assert_eq!(titles.len(), 2);
        assert_eq!(titles.mode(), MatchMode::Segment);
        assert_eq!(titles.resolve("destination").unwrap().label, "To");
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("flighttrail"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        let path = Config::default_data_dir();
        assert!(path.to_string_lossy().contains("flighttrail"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "flighttrail_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
[display]
yes_label = "Sim"

[timeline]
match_mode = "segment"
fields = [{ path = "airplane", label = "Aeronave" }]
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.display.yes_label, "Sim");
        assert_eq!(config.display.no_label, "No");
        assert_eq!(config.timeline.match_mode, MatchMode::Segment);
        assert_eq!(config.timeline.fields.len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_timeline_config_serialize() {
        let timeline = TimelineConfig::default();
        let json = serde_json::to_string(&timeline).unwrap();
        assert!(json.contains(r#""match_mode":"substring""#));
        assert!(json.contains("tailNumber"));
    }

    #[test]
    fn test_storage_config_deserialize() {
        let json = r#"{"max_age_days": 7}"#;
        let storage: StorageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(storage.max_age_days, 7);
        assert!(storage.database_path.is_none());
    }
}
