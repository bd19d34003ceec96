//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand, ValueEnum};

use crate::audit::Action;

/// Record command arguments.
#[derive(Debug, Args)]
pub struct RecordCommand {
    /// Collection the document lives in
    #[arg(long)]
    pub collection: String,

    /// Identifier of the document
    #[arg(long)]
    pub doc_id: String,

    /// The write operation
    #[arg(short, long, value_enum)]
    pub action: ActionArg,

    /// Who performed the write
    #[arg(long)]
    pub actor: Option<String>,

    /// Document state after the write, as JSON or @FILE
    #[arg(short, long, value_name = "JSON|@FILE")]
    pub snapshot: Option<String>,

    /// When the write happened (RFC 3339); defaults to now
    #[arg(long, value_parser = parse_rfc3339)]
    pub at: Option<DateTime<Utc>>,
}

/// Import command arguments.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// JSON Lines file to import, or `-` for stdin
    pub file: PathBuf,
}

/// Timeline command arguments.
#[derive(Debug, Args)]
pub struct TimelineCommand {
    /// Collection the document lives in
    pub collection: String,

    /// Identifier of the document
    pub doc_id: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Diff command arguments.
#[derive(Debug, Args)]
pub struct DiffCommand {
    /// File holding the earlier JSON snapshot
    pub before: PathBuf,

    /// File holding the later JSON snapshot
    pub after: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// History command arguments.
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Collection to list
    pub collection: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Recent command arguments.
#[derive(Debug, Args)]
pub struct RecentCommand {
    /// Number of entries to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Store id of the audit entry
    pub id: i64,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Actor label commands.
#[derive(Debug, Subcommand)]
pub enum ActorCommand {
    /// Set the display label for an actor id
    Set {
        /// Actor id as recorded in audit entries
        id: String,
        /// Label shown in timelines
        label: String,
    },

    /// List known actor labels
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Prune command arguments.
#[derive(Debug, Args)]
pub struct PruneCommand {
    /// Delete entries older than this many days; defaults to `storage.max_age_days`
    #[arg(short, long)]
    pub days: Option<u32>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Audit action argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    /// The document was created
    Insert,
    /// The document was modified
    Update,
    /// The document was deleted
    Remove,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Insert => Self::Insert,
            ActionArg::Update => Self::Update,
            ActionArg::Remove => Self::Remove,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_action_arg_conversion() {
        assert_eq!(Action::from(ActionArg::Insert), Action::Insert);
        assert_eq!(Action::from(ActionArg::Update), Action::Update);
        assert_eq!(Action::from(ActionArg::Remove), Action::Remove);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(
            parse_rfc3339("2024-03-12T07:00:00-03:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 12, 10, 0, 0).unwrap()
        );
        assert!(parse_rfc3339("12/03 10:00").unwrap_err().contains("RFC 3339"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
