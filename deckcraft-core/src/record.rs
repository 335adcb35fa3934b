//! Extracted row/cell records with per-cell styling

use crate::style::CellStyle;
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// A single extracted cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Calendar date, time-of-day already dropped
    Date(NaiveDate),
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Null
    }
}

impl Scalar {
    /// True for null values and strings that trim to nothing
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One cell of a [`RowRecord`]: value plus the interned style it carried
#[derive(Debug, Clone, Serialize)]
pub struct CellRecord {
    pub value: Scalar,
    pub style: Option<Arc<CellStyle>>,
}

impl CellRecord {
    pub fn new(value: Scalar, style: Option<Arc<CellStyle>>) -> Self {
        Self { value, style }
    }

    pub fn empty() -> Self {
        Self {
            value: Scalar::Null,
            style: None,
        }
    }
}

/// One logical data row: header label -> cell, in header order.
///
/// Serializes as a JSON object keyed by header label, which keeps the
/// diagnostic dumps stable regardless of map-iteration quirks.
#[derive(Debug, Clone, Default)]
pub struct RowRecord {
    entries: Vec<(String, CellRecord)>,
}

impl RowRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, header: impl Into<String>, cell: CellRecord) {
        self.entries.push((header.into(), cell));
    }

    pub fn get(&self, header: &str) -> Option<&CellRecord> {
        self.entries
            .iter()
            .find(|(label, _)| label == header)
            .map(|(_, cell)| cell)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellRecord)> {
        self.entries.iter().map(|(label, cell)| (label.as_str(), cell))
    }

    pub fn values(&self) -> impl Iterator<Item = &CellRecord> {
        self.entries.iter().map(|(_, cell)| cell)
    }

    /// True when every cell value is blank
    pub fn is_blank(&self) -> bool {
        self.entries.iter().all(|(_, cell)| cell.value.is_blank())
    }
}

impl Serialize for RowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, cell) in &self.entries {
            map.serialize_entry(label, cell)?;
        }
        map.end()
    }
}

/// The extracted content of one visible worksheet
#[derive(Debug, Clone, Serialize)]
pub struct SheetResult {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RowRecord>,
}

/// Why a worksheet produced no [`SheetResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Sheet state was hidden or veryHidden
    Hidden,
    /// No row with at least two real header labels
    HeaderNotFound,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SkipReason::Hidden => "sheet is hidden",
            SkipReason::HeaderNotFound => "header row not found",
        })
    }
}

/// Per-sheet extraction outcome, tagged so callers can see what was dropped
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SheetOutcome {
    Included(SheetResult),
    Skipped { name: String, reason: SkipReason },
}

impl SheetOutcome {
    pub fn name(&self) -> &str {
        match self {
            SheetOutcome::Included(result) => &result.name,
            SheetOutcome::Skipped { name, .. } => name,
        }
    }

    pub fn as_included(&self) -> Option<&SheetResult> {
        match self {
            SheetOutcome::Included(result) => Some(result),
            SheetOutcome::Skipped { .. } => None,
        }
    }
}
