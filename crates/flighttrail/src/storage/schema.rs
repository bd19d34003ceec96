//! `SQLite` schema definitions for the audit log.
//!
//! Tables created here make up the base schema (version 1). Later additions
//! live in [`super::migrations`].

/// SQL statement to create the audit entries table.
///
/// `created_at` is stored in the fixed-width form produced by
/// [`crate::audit::timestamp_key`] so that text ordering is time ordering.
pub const CREATE_AUDIT_ENTRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS audit_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    document_id TEXT NOT NULL,
    action TEXT NOT NULL,
    snapshot TEXT,
    created_at TEXT NOT NULL,
    actor_id TEXT,
    entry_hash TEXT NOT NULL,
    recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// Index serving per-document history lookups, newest first.
pub const CREATE_DOCUMENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_audit_document
    ON audit_entries(collection, document_id, created_at DESC)
";

/// Index on `entry_hash` for deduplication.
pub const CREATE_HASH_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_audit_hash ON audit_entries(entry_hash)
";

/// Index on `created_at` for recency queries and pruning.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_audit_created_at ON audit_entries(created_at DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_AUDIT_ENTRIES_TABLE,
    CREATE_DOCUMENT_INDEX,
    CREATE_HASH_INDEX,
    CREATE_CREATED_AT_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_audit_entries_table_columns() {
        assert!(CREATE_AUDIT_ENTRIES_TABLE.contains("id INTEGER PRIMARY KEY"));
        assert!(CREATE_AUDIT_ENTRIES_TABLE.contains("collection TEXT NOT NULL"));
        assert!(CREATE_AUDIT_ENTRIES_TABLE.contains("document_id TEXT NOT NULL"));
        assert!(CREATE_AUDIT_ENTRIES_TABLE.contains("snapshot TEXT,"));
        assert!(CREATE_AUDIT_ENTRIES_TABLE.contains("entry_hash TEXT NOT NULL"));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
