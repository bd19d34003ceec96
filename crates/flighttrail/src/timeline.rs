//! Change history reconstruction.
//!
//! A [`TimelineBuilder`] turns the audit entries of one document, newest
//! first, into a list of human-readable changes. Each entry is compared with
//! the entry just before it in time; the oldest entry is shown as the initial
//! state. Only fields listed in the [`FieldTitleMap`] are shown, and entries
//! that changed nothing visible are left out.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::audit::{Action, AuditEntry, AuditSource};
use crate::config::Config;
use crate::diff::{diff, DiffEntry};
use crate::error::Result;
use crate::format::Formatter;
use crate::normalize::{CollapseLists, Identity, Normalizer};
use crate::titles::FieldTitleMap;
use crate::value::Value;

/// Actor label used when an entry has no actor.
pub const SYSTEM_ACTOR: &str = "system";

/// One displayed field change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    /// Human-readable field label.
    pub label: String,
    /// Dotted path of the field that changed.
    pub field_path: String,
    /// Previous value; `None` for the initial state or when it was empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// New value; `None` when the field was cleared or removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// The visible changes made by one audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedChange {
    /// Store id of the audit entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<i64>,
    /// The write operation.
    pub action: Action,
    /// When the write happened.
    pub timestamp: DateTime<Utc>,
    /// `timestamp` formatted for display.
    pub timestamp_display: String,
    /// Who performed the write.
    pub actor_label: String,
    /// Set when the entry had no predecessor, so `rows` list the state it
    /// recorded rather than changes.
    pub initial: bool,
    /// Field changes, in title map order.
    pub rows: Vec<RenderedRow>,
}

/// Builds rendered timelines from audit entries.
pub struct TimelineBuilder {
    titles: FieldTitleMap,
    normalizer: Box<dyn Normalizer>,
    formatter: Formatter,
    actor_labels: HashMap<String, String>,
}

impl std::fmt::Debug for TimelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineBuilder")
            .field("titles", &self.titles)
            .field("formatter", &self.formatter)
            .field("actor_labels", &self.actor_labels.len())
            .finish_non_exhaustive()
    }
}

impl TimelineBuilder {
    /// Create a builder showing the given fields, with no normalization.
    #[must_use]
    pub fn new(titles: FieldTitleMap) -> Self {
        Self {
            titles,
            normalizer: Box::new(Identity),
            formatter: Formatter::default(),
            actor_labels: HashMap::new(),
        }
    }

    /// Create a builder from the timeline and display configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the display settings are invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let formatter = Formatter::from_config(&config.display)?;
        let normalizer = CollapseLists::new(config.timeline.collapse.clone(), formatter.clone());
        Ok(Self::new(config.field_titles())
            .with_formatter(formatter)
            .with_normalizer(normalizer))
    }

    /// Replace the snapshot normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: impl Normalizer + 'static) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    /// Replace the display formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Set the labels shown for actor ids.
    #[must_use]
    pub fn with_actor_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.actor_labels = labels;
        self
    }

    /// The field titles in use.
    #[must_use]
    pub fn titles(&self) -> &FieldTitleMap {
        &self.titles
    }

    /// Fetch a document's entries from `source` and build its timeline.
    ///
    /// # Errors
    ///
    /// Returns the source's error unchanged if fetching fails.
    pub fn fetch_timeline(
        &self,
        source: &impl AuditSource,
        collection: &str,
        document_id: &str,
    ) -> Result<Vec<RenderedChange>> {
        let entries = source.entries_for(collection, document_id)?;
        debug!(
            collection,
            document_id,
            entries = entries.len(),
            "Building timeline"
        );
        Ok(self.build_timeline(&entries))
    }

    /// Build the timeline of one document.
    ///
    /// `entries` must be ordered newest first. Each entry is paired with the
    /// next one in the slice, so out-of-order input pairs the wrong snapshots;
    /// this is logged but not corrected.
    #[must_use]
    pub fn build_timeline(&self, entries: &[AuditEntry]) -> Vec<RenderedChange> {
        let normalized: Vec<Option<Value>> = entries
            .iter()
            .map(|entry| {
                entry
                    .snapshot
                    .as_ref()
                    .map(|snapshot| self.normalizer.normalize(snapshot))
            })
            .collect();

        let mut changes = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            let current = normalized[i].as_ref();
            let initial = i + 1 == entries.len();
            let rows = if let Some(predecessor) = entries.get(i + 1) {
                if predecessor.created_at > entry.created_at {
                    warn!(
                        entry = ?entry.id,
                        predecessor = ?predecessor.id,
                        "Audit entries are not ordered newest first"
                    );
                }
                self.change_rows(normalized[i + 1].as_ref(), current)
            } else {
                self.initial_rows(current)
            };

            if rows.is_empty() {
                trace!(entry = ?entry.id, "No tracked fields changed; skipping entry");
                continue;
            }

            changes.push(RenderedChange {
                entry_id: entry.id,
                action: entry.action,
                timestamp: entry.created_at,
                timestamp_display: self.formatter.timestamp(entry.created_at),
                actor_label: self.actor_label(entry.actor_id.as_deref()),
                initial,
                rows,
            });
        }
        changes
    }

    /// Rows for the oldest entry: every tracked, non-empty field as set.
    fn initial_rows(&self, current: Option<&Value>) -> Vec<RenderedRow> {
        self.render(diff(None, current).into_values(), |entry| {
            let to = entry.to.as_ref()?;
            Some((None, Some(self.formatter.display_non_empty(to)?)))
        })
    }

    /// Rows for a later entry: tracked fields that differ from its predecessor.
    fn change_rows(&self, previous: Option<&Value>, current: Option<&Value>) -> Vec<RenderedRow> {
        self.render(diff(previous, current).into_values(), |entry| {
            let from = entry
                .from
                .as_ref()
                .and_then(|v| self.formatter.display_non_empty(v));
            let to = entry
                .to
                .as_ref()
                .and_then(|v| self.formatter.display_non_empty(v));
            if from.is_none() && to.is_none() {
                return None;
            }
            Some((from, to))
        })
    }

    /// Keep titled entries accepted by `sides`, ordered by title position.
    fn render<F>(&self, entries: impl Iterator<Item = DiffEntry>, sides: F) -> Vec<RenderedRow>
    where
        F: Fn(&DiffEntry) -> Option<(Option<String>, Option<String>)>,
    {
        let mut rows: Vec<(usize, RenderedRow)> = entries
            .filter_map(|entry| {
                let title = self.titles.resolve(&entry.field_path)?;
                let (from, to) = sides(&entry)?;
                Some((
                    title.index,
                    RenderedRow {
                        label: title.label.to_string(),
                        field_path: entry.field_path,
                        from,
                        to,
                    },
                ))
            })
            .collect();

        rows.sort_by(|(a_index, a), (b_index, b)| {
            a_index
                .cmp(b_index)
                .then_with(|| a.field_path.cmp(&b.field_path))
        });
        rows.into_iter().map(|(_, row)| row).collect()
    }

    fn actor_label(&self, actor_id: Option<&str>) -> String {
        match actor_id {
            None => SYSTEM_ACTOR.to_string(),
            Some(id) => self
                .actor_labels
                .get(id)
                .cloned()
                .unwrap_or_else(|| id.to_string()),
        }
    }
}
