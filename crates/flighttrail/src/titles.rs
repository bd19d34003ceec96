//! Field titles: the display allow-list for timelines.
//!
//! A [`FieldTitleMap`] is an ordered list of `(path, label)` pairs. Only
//! fields that resolve to a title appear in a rendered timeline, and rows are
//! shown in map order.

use serde::{Deserialize, Serialize};

/// How a map key matches a field path when there is no exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The key appears anywhere inside the path (`"airplane"` matches
    /// `"airplane.label"` and also `"airplaneId"`).
    #[default]
    Substring,
    /// The key must equal a run of whole dot-separated segments
    /// (`"airplane"` matches `"airplane.label"` but not `"airplaneId"`).
    Segment,
}

/// A field path and its human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTitle {
    /// Field path as it appears in diffs, e.g. `departureDateTime`.
    pub path: String,
    /// Label shown to readers, e.g. `Departure`.
    pub label: String,
}

impl FieldTitle {
    /// Create a new field title.
    #[must_use]
    pub fn new(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }
}

/// A resolved title and its position in the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleMatch<'a> {
    /// Index of the matching entry; used to order rows.
    pub index: usize,
    /// The label to display.
    pub label: &'a str,
}

/// Ordered lookup from field path to label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTitleMap {
    titles: Vec<FieldTitle>,
    mode: MatchMode,
}

impl FieldTitleMap {
    /// Create an empty map with the given match mode.
    #[must_use]
    pub fn new(mode: MatchMode) -> Self {
        Self {
            titles: Vec::new(),
            mode,
        }
    }

    /// Create a map from titles, keeping their order.
    #[must_use]
    pub fn from_titles(titles: impl IntoIterator<Item = FieldTitle>, mode: MatchMode) -> Self {
        Self {
            titles: titles.into_iter().collect(),
            mode,
        }
    }

    /// Append a title, returning the map.
    #[must_use]
    pub fn with_title(mut self, path: impl Into<String>, label: impl Into<String>) -> Self {
        self.titles.push(FieldTitle::new(path, label));
        self
    }

    /// The match mode in effect.
    #[must_use]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Number of titles in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    /// Check if the map has no titles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Iterate over titles in order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldTitle> {
        self.titles.iter()
    }

    /// Resolve a field path to its title.
    ///
    /// An exact match wins. Otherwise the first entry whose key matches under
    /// the map's [`MatchMode`] is used.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<TitleMatch<'_>> {
        let index = self
            .titles
            .iter()
            .position(|t| t.path == path)
            .or_else(|| {
                self.titles
                    .iter()
                    .position(|t| self.key_matches(&t.path, path))
            })?;

        Some(TitleMatch {
            index,
            label: &self.titles[index].label,
        })
    }

    fn key_matches(&self, key: &str, path: &str) -> bool {
        match self.mode {
            MatchMode::Substring => path.contains(key),
            MatchMode::Segment => segments_contain(path, key),
        }
    }
}

/// Check if `key`'s segments appear as a contiguous run in `path`'s segments.
fn segments_contain(path: &str, key: &str) -> bool {
    let path: Vec<&str> = path.split('.').collect();
    let key: Vec<&str> = key.split('.').collect();
    key.len() <= path.len() && path.windows(key.len()).any(|w| w == key.as_slice())
}
