//! Storage layer for flighttrail.
//!
//! This module provides the `SQLite`-backed audit log: an append-only table of
//! audit entries with content-hash deduplication, per-document history
//! lookups, retention pruning and actor display labels.

pub mod import;
pub mod migrations;
pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::audit::{timestamp_key, Action, AuditEntry, AuditSource};
use crate::error::{Error, Result};
use crate::value::Value;

pub use import::{ImportRecord, ImportSummary};

/// Columns selected for every audit entry query, in `row_to_entry` order.
const ENTRY_COLUMNS: &str =
    "id, collection, document_id, action, snapshot, created_at, actor_id";

/// Path reported for in-memory databases.
const MEMORY_PATH: &str = ":memory:";

/// The audit log store.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Appending entries with deduplication
/// - Per-document history, newest first
/// - Pruning of entries past the retention period
/// - Display labels for actor ids
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create an audit log database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and brings the schema up to the current version.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening audit log at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        debug!("Audit log ready at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory audit log.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(MEMORY_PATH),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(MEMORY_PATH),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry to the log.
    ///
    /// Returns the assigned id, or `None` if an entry with identical content
    /// is already stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is malformed or the database operation fails.
    pub fn append(&self, entry: &AuditEntry) -> Result<Option<i64>> {
        entry.validate()?;

        let hash = entry.compute_hash();
        if self.exists_by_hash(&hash)? {
            debug!(
                collection = %entry.collection,
                document_id = %entry.document_id,
                "Skipping duplicate audit entry {}",
                &hash[..16]
            );
            return Ok(None);
        }

        let snapshot = entry
            .snapshot
            .as_ref()
            .map(|s| s.to_json().to_string());

        self.conn.execute(
            r"
            INSERT INTO audit_entries
                (collection, document_id, action, snapshot, created_at, actor_id, entry_hash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                entry.collection,
                entry.document_id,
                entry.action.to_string(),
                snapshot,
                entry.created_at_key(),
                entry.actor_id,
                hash,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(
            collection = %entry.collection,
            document_id = %entry.document_id,
            action = %entry.action,
            "Appended audit entry {id}"
        );
        Ok(Some(id))
    }

    fn exists_by_hash(&self, hash: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM audit_entries WHERE entry_hash = ?1",
            [hash],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get an entry by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<AuditEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM audit_entries WHERE id = ?1");
        let entry = self
            .conn
            .query_row(&sql, [id], Self::row_to_entry)
            .optional()?;
        Ok(entry)
    }

    /// Get an entry by its id, failing when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no entry has this id, or an error if
    /// the database operation fails.
    pub fn entry(&self, id: i64) -> Result<AuditEntry> {
        self.get(id)?
            .ok_or_else(|| Error::not_found(format!("audit entry {id}")))
    }

    /// Get every entry for one document, newest first.
    ///
    /// Entries sharing a timestamp are ordered by id, latest append first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn entries_for(&self, collection: &str, document_id: &str) -> Result<Vec<AuditEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM audit_entries
             WHERE collection = ?1 AND document_id = ?2
             ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![collection, document_id], Self::row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Get the most recent entries across all documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM audit_entries
             ORDER BY created_at DESC, id DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map([limit_i64], Self::row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// List the documents of a collection with their entry counts, most
    /// recently changed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn documents(&self, collection: &str) -> Result<Vec<DocumentSummary>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT document_id, COUNT(*), MAX(created_at) AS last_changed
            FROM audit_entries WHERE collection = ?1
            GROUP BY document_id
            ORDER BY last_changed DESC, document_id ASC
            ",
        )?;

        let documents = stmt
            .query_map([collection], |row| {
                Ok(DocumentSummary {
                    document_id: row.get(0)?,
                    entry_count: row.get(1)?,
                    last_changed: parse_timestamp_column(row, 2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    /// Count total entries in the log.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM audit_entries", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete entries created more than `max_age` ago.
    ///
    /// Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn prune_older_than(&self, max_age: Duration) -> Result<usize> {
        let cutoff = timestamp_key(Utc::now() - max_age);

        let affected = self
            .conn
            .execute("DELETE FROM audit_entries WHERE created_at < ?1", [cutoff])?;

        if affected > 0 {
            info!("Pruned {} old audit entries", affected);
        }
        Ok(affected)
    }

    /// Set the display label for an actor id, replacing any previous label.
    ///
    /// # Errors
    ///
    /// Returns an error if the label is empty or the database operation fails.
    pub fn set_actor_label(&self, actor_id: &str, label: &str) -> Result<()> {
        if actor_id.is_empty() || label.is_empty() {
            return Err(Error::invalid_entry("actor id and label must not be empty"));
        }
        self.conn.execute(
            r"
            INSERT INTO actors (id, label) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET label = excluded.label
            ",
            params![actor_id, label],
        )?;
        debug!("Set label for actor {actor_id}");
        Ok(())
    }

    /// Get all actor display labels, keyed by actor id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn actor_labels(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT id, label FROM actors")?;
        let labels: HashMap<String, String> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(labels)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_entries = self.count()?;

        let collections: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT collection) FROM audit_entries",
            [],
            |row| row.get(0),
        )?;

        let documents: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM (SELECT DISTINCT collection, document_id FROM audit_entries)",
            [],
            |row| row.get(0),
        )?;

        let (oldest_entry, newest_entry) = self.conn.query_row(
            "SELECT MIN(created_at), MAX(created_at) FROM audit_entries",
            [],
            |row| {
                let oldest: Option<String> = row.get(0)?;
                let newest: Option<String> = row.get(1)?;
                Ok((oldest, newest))
            },
        )?;

        let db_size_bytes = if self.path.as_os_str() == MEMORY_PATH {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_entries,
            collections,
            documents,
            oldest_entry: oldest_entry.as_deref().and_then(parse_timestamp),
            newest_entry: newest_entry.as_deref().and_then(parse_timestamp),
            db_size_bytes,
        })
    }

    /// Convert a database row to an `AuditEntry`.
    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<AuditEntry> {
        let action: String = row.get(3)?;
        let action: Action = action.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.to_string().into())
        })?;

        let snapshot: Option<String> = row.get(4)?;
        let snapshot = snapshot
            .map(|text| serde_json::from_str::<serde_json::Value>(&text))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
            .map(Value::from);

        Ok(AuditEntry {
            id: Some(row.get(0)?),
            collection: row.get(1)?,
            document_id: row.get(2)?,
            action,
            snapshot,
            created_at: parse_timestamp_column(row, 5)?,
            actor_id: row.get(6)?,
        })
    }
}

impl AuditSource for Storage {
    fn entries_for(&self, collection: &str, document_id: &str) -> Result<Vec<AuditEntry>> {
        Storage::entries_for(self, collection, document_id)
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// One document's entry in a collection listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    /// Identifier of the document.
    pub document_id: String,
    /// Number of audit entries recorded for it.
    pub entry_count: i64,
    /// Timestamp of its newest entry.
    pub last_changed: DateTime<Utc>,
}

/// Statistics about the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Total number of entries stored.
    pub total_entries: i64,
    /// Number of distinct collections.
    pub collections: i64,
    /// Number of distinct documents across all collections.
    pub documents: i64,
    /// Timestamp of the oldest entry.
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Timestamp of the newest entry.
    pub newest_entry: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
