//! Bulk import of audit entries from JSON Lines.
//!
//! Each line holds one entry as exported from the document
//! database's audit collection:
//!
//! ```json
//! {"collection": "flights", "docId": "f1", "action": "update",
//!  "doc": {"name": "N1"}, "createdAt": {"$date": 1710237600000}, "userId": "u1"}
//! ```
//!
//! The import runs in a single transaction. A malformed or blank line aborts
//! it and nothing is written. Lines already present in the log are skipped, so
//! importing the same file twice is harmless.

use std::io::{BufRead, ErrorKind};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_jsonlines::JsonLinesReader;
use tracing::{debug, info};

use crate::audit::{Action, AuditEntry};
use crate::error::{Error, Result};
use crate::value::Value;

use super::Storage;

/// One line of an import file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// Collection the document lives in.
    pub collection: String,
    /// Identifier of the document.
    pub doc_id: String,
    /// `insert`, `update` or `remove`.
    pub action: String,
    /// Document state after the write.
    #[serde(default)]
    pub doc: Option<serde_json::Value>,
    /// RFC 3339 string or `{"$date": millis}`.
    pub created_at: serde_json::Value,
    /// Who performed the write.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ImportRecord {
    /// Convert the record into an audit entry.
    ///
    /// A document sent with a remove is dropped, and a null document counts as
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the action or timestamp cannot be understood.
    pub fn into_entry(self) -> Result<AuditEntry> {
        let action: Action = self.action.parse()?;
        let created_at = parse_created_at(&self.created_at)?;

        let snapshot = match action {
            Action::Remove => None,
            Action::Insert | Action::Update => self
                .doc
                .filter(|doc| !doc.is_null())
                .map(Value::from),
        };

        let mut entry = AuditEntry::new(self.collection, self.doc_id, action, snapshot).at(created_at);
        entry.actor_id = self.user_id.filter(|id| !id.is_empty());
        Ok(entry)
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Entries newly written.
    pub imported: usize,
    /// Entries already present and skipped.
    pub skipped: usize,
}

/// Parse a `createdAt` value into a UTC timestamp.
fn parse_created_at(raw: &serde_json::Value) -> Result<DateTime<Utc>> {
    match Value::from(raw.clone()) {
        Value::Date(at) => Ok(at),
        Value::String(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::invalid_timestamp(text, e.to_string())),
        other => Err(Error::invalid_timestamp(
            raw.to_string(),
            format!(
                "expected an RFC 3339 string or {{\"$date\": millis}}, got {}",
                other.type_name()
            ),
        )),
    }
}

impl Storage {
    /// Import audit entries from a JSON Lines reader.
    ///
    /// # Errors
    ///
    /// Returns an error naming the line number if a line cannot be read,
    /// parsed or validated, or if the database operation fails. No entries
    /// are written in that case.
    pub fn import_jsonl(&self, reader: impl BufRead) -> Result<ImportSummary> {
        let tx = self.conn.unchecked_transaction()?;
        let mut summary = ImportSummary::default();

        let records = JsonLinesReader::new(reader).read_all::<ImportRecord>();
        for (index, record) in records.enumerate() {
            let line_no = index + 1;
            let record = record.map_err(|e| match e.kind() {
                ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
                    Error::invalid_entry(format!("line {line_no}: {e}"))
                }
                _ => Error::Io(e),
            })?;
            let entry = record
                .into_entry()
                .and_then(|entry| entry.validate().map(|()| entry))
                .map_err(|e| Error::invalid_entry(format!("line {line_no}: {e}")))?;

            match self.append(&entry)? {
                Some(_) => summary.imported += 1,
                None => summary.skipped += 1,
            }
        }

        tx.commit()?;
        debug!(?summary, "Import finished");
        info!(
            "Imported {} audit entries ({} already present)",
            summary.imported, summary.skipped
        );
        Ok(summary)
    }
}
