//! `flitrail` - CLI for flighttrail
//!
//! This binary records audit entries, imports them in bulk and prints the
//! readable change history of audited documents.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use flighttrail::cli::{
    self, output, ActorCommand, Cli, Command, ConfigCommand, DiffCommand, HistoryCommand,
    ImportCommand, OutputFormat, PruneCommand, RecentCommand, RecordCommand, ShowCommand,
    TimelineCommand,
};
use flighttrail::config::retention;
use flighttrail::{diff, init_logging, AuditEntry, Config, Formatter, Storage, TimelineBuilder};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Record(cmd) => handle_record(&config, cmd),
        Command::Import(cmd) => handle_import(&config, &cmd),
        Command::Timeline(cmd) => handle_timeline(&config, &cmd),
        Command::Diff(cmd) => handle_diff(&config, &cmd),
        Command::History(cmd) => handle_history(&config, &cmd),
        Command::Recent(cmd) => handle_recent(&config, &cmd),
        Command::Show(cmd) => handle_show(&config, &cmd),
        Command::Actor(cmd) => handle_actor(&config, cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Prune(cmd) => handle_prune(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cli.config, cmd),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    let path = config.database_path();
    Storage::open(&path).with_context(|| format!("opening audit log at {}", path.display()))
}

fn handle_record(config: &Config, cmd: RecordCommand) -> Result<()> {
    let snapshot = cmd
        .snapshot
        .as_deref()
        .map(cli::load_snapshot_arg)
        .transpose()
        .context("reading snapshot")?;

    let mut entry = AuditEntry::new(cmd.collection, cmd.doc_id, cmd.action.into(), snapshot);
    if let Some(at) = cmd.at {
        entry = entry.at(at);
    }
    if let Some(actor) = cmd.actor {
        entry = entry.with_actor(actor);
    }

    let storage = open_storage(config)?;
    match storage.append(&entry)? {
        Some(id) => println!("Recorded entry {id}"),
        None => println!("Identical entry already recorded; nothing written"),
    }
    Ok(())
}

fn handle_import(config: &Config, cmd: &ImportCommand) -> Result<()> {
    let storage = open_storage(config)?;

    let summary = if cmd.file.as_os_str() == "-" {
        storage.import_jsonl(io::stdin().lock())?
    } else {
        let file = File::open(&cmd.file)
            .with_context(|| format!("opening {}", cmd.file.display()))?;
        storage.import_jsonl(BufReader::new(file))?
    };

    println!(
        "Imported {} entries ({} already present)",
        summary.imported, summary.skipped
    );
    Ok(())
}

fn handle_timeline(config: &Config, cmd: &TimelineCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let builder = TimelineBuilder::from_config(config)?.with_actor_labels(storage.actor_labels()?);
    let changes = builder.fetch_timeline(&storage, &cmd.collection, &cmd.doc_id)?;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&changes)?),
        OutputFormat::Plain if changes.is_empty() => {
            println!("No recorded changes for {}/{}", cmd.collection, cmd.doc_id);
        }
        OutputFormat::Plain => println!("{}", output::render_timeline(&changes)),
    }
    Ok(())
}

fn handle_diff(config: &Config, cmd: &DiffCommand) -> Result<()> {
    let before = cli::load_snapshot_file(&cmd.before)
        .with_context(|| format!("reading {}", cmd.before.display()))?;
    let after = cli::load_snapshot_file(&cmd.after)
        .with_context(|| format!("reading {}", cmd.after.display()))?;

    let changes = diff(Some(&before), Some(&after));
    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    } else if changes.is_empty() {
        println!("No differences");
    } else {
        let formatter = Formatter::from_config(&config.display)?;
        println!("{}", output::render_diff(&changes, &formatter));
    }
    Ok(())
}

fn handle_history(config: &Config, cmd: &HistoryCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let documents = storage.documents(&cmd.collection)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&documents)?);
    } else if documents.is_empty() {
        println!("No audited documents in {}", cmd.collection);
    } else {
        let formatter = Formatter::from_config(&config.display)?;
        println!("{}", output::render_documents(&documents, &formatter));
    }
    Ok(())
}

fn handle_recent(config: &Config, cmd: &RecentCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let entries = storage.recent(cmd.limit)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("The audit log is empty");
    } else {
        let formatter = Formatter::from_config(&config.display)?;
        println!("{}", output::render_entries(&entries, &formatter));
    }
    Ok(())
}

fn handle_show(config: &Config, cmd: &ShowCommand) -> Result<()> {
    let storage = open_storage(config)?;
    let entry = storage.entry(cmd.id)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let formatter = Formatter::from_config(&config.display)?;
        println!("{}", output::render_entry(&entry, &formatter));
    }
    Ok(())
}

fn handle_actor(config: &Config, cmd: ActorCommand) -> Result<()> {
    let storage = open_storage(config)?;
    match cmd {
        ActorCommand::Set { id, label } => {
            storage.set_actor_label(&id, &label)?;
            println!("{id} is now shown as \"{label}\"");
        }
        ActorCommand::List { json } => {
            let mut labels: Vec<_> = storage.actor_labels()?.into_iter().collect();
            labels.sort();
            if json {
                let map: serde_json::Map<String, serde_json::Value> = labels
                    .into_iter()
                    .map(|(id, label)| (id, serde_json::Value::String(label)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (id, label) in labels {
                    println!("{id}\t{label}");
                }
            }
        }
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "total_entries": stats.total_entries,
            "collections": stats.collections,
            "documents": stats.documents,
            "oldest_entry": stats.oldest_entry,
            "newest_entry": stats.newest_entry,
            "db_size_bytes": stats.db_size_bytes,
            "max_age_days": config.storage.max_age_days,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let formatter = Formatter::from_config(&config.display)?;
        let show = |at: Option<chrono::DateTime<chrono::Utc>>| {
            at.map_or_else(|| "-".to_string(), |at| formatter.timestamp(at))
        };
        println!("flitrail status");
        println!("---------------");
        println!("Database:      {}", storage.path().display());
        println!("Entries:       {}", stats.total_entries);
        println!("Collections:   {}", stats.collections);
        println!("Documents:     {}", stats.documents);
        println!("Oldest entry:  {}", show(stats.oldest_entry));
        println!("Newest entry:  {}", show(stats.newest_entry));
        println!("Size:          {} bytes", stats.db_size_bytes);
        match config.storage.max_age_days {
            0 => println!("Retention:     forever"),
            days => println!("Retention:     {days} days"),
        }
    }
    Ok(())
}

fn handle_prune(config: &Config, cmd: &PruneCommand) -> Result<()> {
    let max_age = cmd.days.map_or_else(|| config.max_age(), retention);
    let Some(max_age) = max_age else {
        println!("Retention is disabled (max_age_days = 0); nothing pruned");
        return Ok(());
    };

    let storage = open_storage(config)?;
    let pruned = storage.prune_older_than(max_age)?;
    println!(
        "Pruned {pruned} entries older than {} days",
        max_age.num_days()
    );
    Ok(())
}

fn handle_config(config: &Config, custom_path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Max age (days):     {}", config.storage.max_age_days);
                println!();
                println!("[Display]");
                println!("  Date format:        {}", config.display.date_format);
                println!("  UTC offset (min):   {}", config.display.utc_offset_minutes);
                println!(
                    "  Booleans:           {} / {}",
                    config.display.yes_label, config.display.no_label
                );
                println!();
                println!("[Timeline]");
                println!("  Match mode:         {:?}", config.timeline.match_mode);
                println!("  Fields:");
                for field in &config.timeline.fields {
                    println!("    {:<20} {}", field.path, field.label);
                }
                println!("  Collapsed lists:");
                for rule in &config.timeline.collapse {
                    println!("    {:<20} [{}]", rule.field, rule.keys.join(", "));
                }
            }
        }
        ConfigCommand::Path => {
            let path = custom_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(custom_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
