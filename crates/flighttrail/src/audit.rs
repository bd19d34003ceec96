//! Core audit log types for flighttrail.
//!
//! This module defines the recorded write events that change histories are
//! rebuilt from, and the trait through which they are fetched.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;

/// Fractional-second digits kept in stored timestamps.
const STORED_SUBSEC_DIGITS: u16 = 6;

/// The write operation an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// The document was created.
    Insert,
    /// The document was modified.
    Update,
    /// The document was deleted.
    Remove,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "remove" => Ok(Self::Remove),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// One recorded insert, update or remove on a watched collection.
///
/// Entries are appended once and never modified. For a given
/// `(collection, document_id)` they are totally ordered by `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Identifier assigned by the audit log store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Name of the collection the document lives in.
    pub collection: String,

    /// Identifier of the document within its collection.
    pub document_id: String,

    /// The write operation.
    pub action: Action,

    /// Full state of the document after the write; `None` for removals.
    pub snapshot: Option<Value>,

    /// When the write happened, to the microsecond the store keeps.
    pub created_at: DateTime<Utc>,

    /// Who performed the write, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
}

impl AuditEntry {
    /// Create a new entry stamped with the current time.
    #[must_use]
    pub fn new(
        collection: impl Into<String>,
        document_id: impl Into<String>,
        action: Action,
        snapshot: Option<Value>,
    ) -> Self {
        Self {
            id: None,
            collection: collection.into(),
            document_id: document_id.into(),
            action,
            snapshot,
            created_at: Utc::now().trunc_subsecs(STORED_SUBSEC_DIGITS),
            actor_id: None,
        }
    }

    /// Set who performed the write.
    #[must_use]
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Set when the write happened. Sub-microsecond digits are dropped.
    #[must_use]
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at.trunc_subsecs(STORED_SUBSEC_DIGITS);
        self
    }

    /// Check that the entry is well formed.
    ///
    /// Inserts and updates carry a snapshot, removals do not, and both
    /// identifying names are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntry`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.collection.is_empty() {
            return Err(Error::invalid_entry("collection must not be empty"));
        }
        if self.document_id.is_empty() {
            return Err(Error::invalid_entry("document id must not be empty"));
        }
        match (self.action, &self.snapshot) {
            (Action::Remove, Some(_)) => Err(Error::invalid_entry(
                "remove entries must not carry a snapshot",
            )),
            (Action::Insert | Action::Update, None) => Err(Error::invalid_entry(format!(
                "{} entries must carry a snapshot",
                self.action
            ))),
            _ => Ok(()),
        }
    }

    /// Canonical text form of the timestamp, sortable as a string.
    #[must_use]
    pub fn created_at_key(&self) -> String {
        timestamp_key(self.created_at)
    }

    /// Compute the BLAKE3 hash identifying this entry's content.
    ///
    /// The store id is not part of the hash, so the same event imported twice
    /// hashes the same.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let snapshot = self
            .snapshot
            .as_ref()
            .map(|s| s.to_json().to_string())
            .unwrap_or_default();

        let action = self.action.to_string();
        let created_at = self.created_at_key();

        let mut hasher = blake3::Hasher::new();
        for part in [
            self.collection.as_str(),
            self.document_id.as_str(),
            action.as_str(),
            created_at.as_str(),
            self.actor_id.as_deref().unwrap_or(""),
            snapshot.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Format a timestamp the way the audit log stores and sorts it.
#[must_use]
pub fn timestamp_key(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A source of audit entries, such as the SQLite store.
pub trait AuditSource {
    /// Fetch every entry for one document, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn entries_for(&self, collection: &str, document_id: &str) -> Result<Vec<AuditEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn flight(name: &str) -> Value {
        Value::from(json!({"name": name}))
    }

    #[test]
    fn test_action_display_and_parse() {
        for action in [Action::Insert, Action::Update, Action::Remove] {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
        assert!(matches!(
            "upsert".parse::<Action>(),
            Err(Error::UnknownAction(_))
        ));
    }

    #[test]
    fn test_entry_new() {
        let entry = AuditEntry::new("flights", "f1", Action::Insert, Some(flight("N1")))
            .with_actor("u1");
        assert!(entry.id.is_none());
        assert_eq!(entry.collection, "flights");
        assert_eq!(entry.document_id, "f1");
        assert_eq!(entry.actor_id.as_deref(), Some("u1"));
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_timestamps_keep_microseconds() {
        let precise = Utc.with_ymd_and_hms(2024, 3, 12, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let entry = AuditEntry::new("flights", "f1", Action::Remove, None).at(precise);
        assert_eq!(entry.created_at.timestamp_subsec_nanos(), 123_456_000);

        let now = AuditEntry::new("flights", "f1", Action::Remove, None);
        assert_eq!(now.created_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_validate_rejects_snapshotless_update() {
        let entry = AuditEntry::new("flights", "f1", Action::Update, None);
        let err = entry.validate().unwrap_err();
        assert!(err.to_string().contains("update entries must carry a snapshot"));
    }

    #[test]
    fn test_validate_rejects_remove_with_snapshot() {
        let entry = AuditEntry::new("flights", "f1", Action::Remove, Some(flight("N1")));
        assert!(entry.validate().is_err());
        let entry = AuditEntry::new("flights", "f1", Action::Remove, None);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_names() {
        assert!(AuditEntry::new("", "f1", Action::Remove, None)
            .validate()
            .is_err());
        assert!(AuditEntry::new("flights", "", Action::Remove, None)
            .validate()
            .is_err());
    }

    #[test]
    fn test_hash_consistency() {
        let at = Utc.with_ymd_and_hms(2024, 3, 12, 10, 0, 0).unwrap();
        let a = AuditEntry::new("flights", "f1", Action::Insert, Some(flight("N1"))).at(at);
        let mut b = a.clone();
        b.id = Some(99);
        assert_eq!(a.compute_hash(), b.compute_hash());

        let c = a.clone().with_actor("u2");
        assert_ne!(a.compute_hash(), c.compute_hash());

        let d = AuditEntry::new("flights", "f1", Action::Insert, Some(flight("N2"))).at(at);
        assert_ne!(a.compute_hash(), d.compute_hash());
    }

    #[test]
    fn test_timestamp_key_sorts_lexically() {
        let early = Utc.with_ymd_and_hms(2024, 3, 12, 9, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 12, 10, 0, 0).unwrap();
        assert!(timestamp_key(early) < timestamp_key(late));
        assert_eq!(timestamp_key(late), "2024-03-12T10:00:00.000000Z");
    }

    #[test]
    fn test_entry_serialization() {
        let entry = AuditEntry::new("flights", "f1", Action::Remove, None);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""action":"remove""#));
        assert!(!json.contains("actor_id"));

        let back: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
