//! Plain-text rendering for command output.

use crate::audit::AuditEntry;
use crate::diff::{ChangeKind, DiffMap};
use crate::format::Formatter;
use crate::storage::DocumentSummary;
use crate::timeline::{RenderedChange, SYSTEM_ACTOR};

/// Shown in place of a value that is absent or empty.
const EMPTY_MARKER: &str = "(empty)";

/// Shown in place of the empty path of a top-level leaf.
const ROOT_MARKER: &str = "(root)";

/// Render a timeline, one block per change.
#[must_use]
pub fn render_timeline(changes: &[RenderedChange]) -> String {
    let mut lines = Vec::new();
    for change in changes {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!(
            "{}  {}  by {}",
            change.timestamp_display, change.action, change.actor_label
        ));
        for row in &change.rows {
            let to = row.to.as_deref().unwrap_or(EMPTY_MARKER);
            match &row.from {
                Some(from) => lines.push(format!("  {}: {from} -> {to}", row.label)),
                None if change.initial => lines.push(format!("  {}: {to}", row.label)),
                None => lines.push(format!("  {}: {EMPTY_MARKER} -> {to}", row.label)),
            }
        }
    }
    lines.join("\n")
}

/// Render a raw snapshot diff, one line per field.
#[must_use]
pub fn render_diff(diff: &DiffMap, formatter: &Formatter) -> String {
    diff.values()
        .map(|entry| {
            let path = if entry.field_path.is_empty() {
                ROOT_MARKER
            } else {
                entry.field_path.as_str()
            };
            let show = |side: Option<&crate::value::Value>| {
                side.and_then(|v| formatter.display_non_empty(v))
                    .unwrap_or_else(|| EMPTY_MARKER.to_string())
            };
            match entry.kind() {
                ChangeKind::Added => format!("+ {path}: {}", show(entry.to.as_ref())),
                ChangeKind::Removed => format!("- {path}: {}", show(entry.from.as_ref())),
                ChangeKind::Changed => format!(
                    "~ {path}: {} -> {}",
                    show(entry.from.as_ref()),
                    show(entry.to.as_ref())
                ),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a collection's document listing.
#[must_use]
pub fn render_documents(documents: &[DocumentSummary], formatter: &Formatter) -> String {
    let width = documents
        .iter()
        .map(|d| d.document_id.len())
        .max()
        .unwrap_or(0);
    documents
        .iter()
        .map(|d| {
            format!(
                "{:<width$}  {:>4} entries  last changed {}",
                d.document_id,
                d.entry_count,
                formatter.timestamp(d.last_changed)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a list of entries, one line each, newest first.
#[must_use]
pub fn render_entries(entries: &[AuditEntry], formatter: &Formatter) -> String {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{:>6}  {}  {}/{}  {}  by {}",
                entry.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                formatter.timestamp(entry.created_at),
                entry.collection,
                entry.document_id,
                entry.action,
                entry.actor_id.as_deref().unwrap_or(SYSTEM_ACTOR)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render one entry with its full snapshot.
#[must_use]
pub fn render_entry(entry: &AuditEntry, formatter: &Formatter) -> String {
    let mut lines = vec![
        format!(
            "Entry:     {}",
            entry.id.map_or_else(|| "-".to_string(), |id| id.to_string())
        ),
        format!("Document:  {}/{}", entry.collection, entry.document_id),
        format!("Action:    {}", entry.action),
        format!("When:      {}", formatter.timestamp(entry.created_at)),
        format!(
            "Actor:     {}",
            entry.actor_id.as_deref().unwrap_or(SYSTEM_ACTOR)
        ),
    ];
    match &entry.snapshot {
        Some(snapshot) => lines.push(format!("Snapshot:\n{:#}", snapshot.to_json())),
        None => lines.push(format!("Snapshot:  {EMPTY_MARKER}")),
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{Action, AuditEntry};
    use crate::diff::diff;
    use crate::titles::{FieldTitleMap, MatchMode};
    use crate::timeline::TimelineBuilder;
    use crate::value::Value;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_render_timeline() {
        let titles = FieldTitleMap::new(MatchMode::Substring)
            .with_title("name", "Name")
            .with_title("notes", "Notes");
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 12, h, 0, 0).unwrap();
        let mut newer = AuditEntry::new(
            "flights",
            "f1",
            Action::Update,
            Some(Value::from(json!({"name": "N2", "notes": "late"}))),
        )
        .at(at(11))
        .with_actor("u1");
        newer.id = Some(2);
        let older = AuditEntry::new(
            "flights",
            "f1",
            Action::Insert,
            Some(Value::from(json!({"name": "N1"}))),
        )
        .at(at(10));

        let changes = TimelineBuilder::new(titles).build_timeline(&[newer, older]);
        assert_eq!(
            render_timeline(&changes),
            [
                "12/03 11:00  update  by u1",
                "  Name: N1 -> N2",
                "  Notes: (empty) -> late",
                "",
                "12/03 10:00  insert  by system",
                "  Name: N1",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_render_timeline_after_pruning() {
        let titles = FieldTitleMap::new(MatchMode::Substring).with_title("name", "Name");
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 12, h, 0, 0).unwrap();
        let oldest = AuditEntry::new(
            "flights",
            "f1",
            Action::Update,
            Some(Value::from(json!({"name": "N1"}))),
        )
        .at(at(10))
        .with_actor("u1");

        let changes = TimelineBuilder::new(titles).build_timeline(&[oldest]);
        assert_eq!(
            render_timeline(&changes),
            ["12/03 10:00  update  by u1", "  Name: N1"].join("\n")
        );
    }

    #[test]
    fn test_render_reinsert_as_change() {
        let titles = FieldTitleMap::new(MatchMode::Substring).with_title("name", "Name");
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 12, h, 0, 0).unwrap();
        let entries = [
            AuditEntry::new(
                "flights",
                "f1",
                Action::Insert,
                Some(Value::from(json!({"name": "N2"}))),
            )
            .at(at(12)),
            AuditEntry::new("flights", "f1", Action::Remove, None).at(at(11)),
            AuditEntry::new(
                "flights",
                "f1",
                Action::Insert,
                Some(Value::from(json!({"name": "N1"}))),
            )
            .at(at(10)),
        ];

        let changes = TimelineBuilder::new(titles).build_timeline(&entries);
        let rendered = render_timeline(&changes);
        assert!(
            rendered.starts_with("12/03 12:00  insert  by system\n  Name: (empty) -> N2"),
            "{rendered}"
        );
    }

    #[test]
    fn test_render_empty_timeline() {
        assert_eq!(render_timeline(&[]), "");
    }

    #[test]
    fn test_render_diff() {
        let before = Value::from(json!({"a": 1, "b": {"c": "x"}, "gone": true}));
        let after = Value::from(json!({"a": 2, "b": {"c": "y"}, "new": [1, 2]}));
        let out = render_diff(&diff(Some(&before), Some(&after)), &Formatter::default());
        assert_eq!(
            out,
            ["~ a: 1 -> 2", "~ b.c: x -> y", "- gone: Yes", "+ new: 1 | 2"].join("\n")
        );
    }

    #[test]
    fn test_render_diff_root_leaf() {
        let out = render_diff(
            &diff(Some(&Value::from(1_i64)), Some(&Value::from(2_i64))),
            &Formatter::default(),
        );
        assert_eq!(out, "~ (root): 1 -> 2");
    }

    #[test]
    fn test_render_entries() {
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 12, h, 0, 0).unwrap();
        let mut update = AuditEntry::new(
            "flights",
            "f1",
            Action::Update,
            Some(Value::from(json!({"name": "N2"}))),
        )
        .at(at(11))
        .with_actor("u1");
        update.id = Some(12);
        let mut remove = AuditEntry::new("crew", "c7", Action::Remove, None).at(at(9));
        remove.id = Some(3);

        assert_eq!(
            render_entries(&[update, remove], &Formatter::default()),
            [
                "    12  12/03 11:00  flights/f1  update  by u1",
                "     3  12/03 09:00  crew/c7  remove  by system",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_render_entry() {
        let mut entry = AuditEntry::new(
            "flights",
            "f1",
            Action::Insert,
            Some(Value::from(json!({"name": "N1"}))),
        )
        .at(Utc.with_ymd_and_hms(2024, 3, 12, 10, 0, 0).unwrap());
        entry.id = Some(1);

        let out = render_entry(&entry, &Formatter::default());
        assert!(out.starts_with("Entry:     1\nDocument:  flights/f1\nAction:    insert"));
        assert!(out.contains("When:      12/03 10:00"));
        assert!(out.contains("Actor:     system"));
        assert!(out.ends_with("Snapshot:\n{\n  \"name\": \"N1\"\n}"), "{out}");

        let remove = AuditEntry::new("flights", "f1", Action::Remove, None);
        assert!(render_entry(&remove, &Formatter::default()).ends_with("Snapshot:  (empty)"));
    }

    #[test]
    fn test_render_documents() {
        let documents = vec![
            DocumentSummary {
                document_id: "f1".to_string(),
                entry_count: 12,
                last_changed: Utc.with_ymd_and_hms(2024, 3, 12, 10, 0, 0).unwrap(),
            },
            DocumentSummary {
                document_id: "f100".to_string(),
                entry_count: 3,
                last_changed: Utc.with_ymd_and_hms(2024, 3, 11, 9, 30, 0).unwrap(),
            },
        ];
        assert_eq!(
            render_documents(&documents, &Formatter::default()),
            [
                "f1      12 entries  last changed 12/03 10:00",
                "f100     3 entries  last changed 11/03 09:30",
            ]
            .join("\n")
        );
    }
}
