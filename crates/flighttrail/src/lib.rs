//! `flighttrail` - Readable change history from an audit log
//!
//! This library rebuilds the history of a document from audit entries that
//! each hold a full snapshot. Consecutive snapshots are diffed field by field,
//! the paths are resolved against configured titles, and the result is a
//! timeline a person can read. A `SQLite` store keeps the entries.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod audit;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod format;
pub mod logging;
pub mod normalize;
pub mod storage;
pub mod timeline;
pub mod titles;
pub mod value;

pub use audit::{Action, AuditEntry, AuditSource};
pub use config::Config;
pub use diff::{diff, ChangeKind, DiffEntry, DiffMap};
pub use error::{Error, Result};
pub use format::Formatter;
pub use logging::init_logging;
pub use normalize::{CollapseLists, CollapseRule, Identity, Normalizer};
pub use storage::{DocumentSummary, Storage, StorageStats};
pub use timeline::{RenderedChange, RenderedRow, TimelineBuilder};
pub use titles::{FieldTitle, FieldTitleMap, MatchMode};
pub use value::Value;
