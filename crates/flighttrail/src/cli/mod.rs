//! Command-line interface for flighttrail.
//!
//! This module provides the CLI structure and command helpers for the
//! `flitrail` binary.

mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::error::{Error, Result};
use crate::value::Value;

pub use commands::{
    ActionArg, ActorCommand, ConfigCommand, DiffCommand, HistoryCommand, ImportCommand,
    OutputFormat, PruneCommand, RecentCommand, RecordCommand, ShowCommand, StatusCommand,
    TimelineCommand,
};

/// flitrail - Readable change history for audited documents
///
/// Records insert, update and remove events for documents and turns them
/// into a timeline of labelled field changes.
#[derive(Debug, Parser)]
#[command(name = "flitrail")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Append an audit entry
    Record(RecordCommand),

    /// Import audit entries from a JSON Lines file
    Import(ImportCommand),

    /// Show the change timeline of a document
    Timeline(TimelineCommand),

    /// Compare two JSON snapshot files
    Diff(DiffCommand),

    /// List the audited documents of a collection
    History(HistoryCommand),

    /// List the latest entries across all documents
    Recent(RecentCommand),

    /// Show one audit entry
    Show(ShowCommand),

    /// Manage actor display labels
    #[command(subcommand)]
    Actor(ActorCommand),

    /// Show audit log status
    Status(StatusCommand),

    /// Delete entries past the retention period
    Prune(PruneCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}

/// Parse a snapshot argument: inline JSON, or `@path` to read a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the text is not JSON.
pub fn load_snapshot_arg(arg: &str) -> Result<Value> {
    match arg.strip_prefix('@') {
        Some(path) => load_snapshot_file(Path::new(path)),
        None => parse_snapshot(arg),
    }
}

/// Read a JSON snapshot from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not hold JSON.
pub fn load_snapshot_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)?;
    parse_snapshot(&text)
}

fn parse_snapshot(text: &str) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| Error::invalid_entry(format!("snapshot is not valid JSON: {e}")))?;
    Ok(Value::from(json))
}
