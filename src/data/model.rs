use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const TRACK_ID: &str = "track_id";
pub const TRACK_GENRE: &str = "track_genre";
pub const POPULARITY: &str = "popularity";

/// Model inputs, in the order coefficients are fitted.
pub const AUDIO_FEATURES: [&str; 9] = [
    "danceability",
    "energy",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
];

/// Popularity followed by the audio features: the correlation axes.
pub const NUMERIC_COLUMNS: [&str; 10] = [
    POPULARITY,
    "danceability",
    "energy",
    "loudness",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
];

/// Every column the pipeline reads. Anything else is carried for previews.
pub fn required_columns() -> impl Iterator<Item = &'static str> {
    [TRACK_ID, TRACK_GENRE].into_iter().chain(NUMERIC_COLUMNS)
}

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV reader infers.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Empty field or a recognised missing-value marker.
    Null,
}

/// Markers read as missing, besides the empty field.
const MISSING_MARKERS: [&str; 7] = ["NA", "N/A", "NaN", "nan", "NULL", "null", "<NA>"];

impl CellValue {
    /// Infer the type of a raw CSV field.
    pub fn parse(s: &str) -> CellValue {
        let s = s.trim();
        if s.is_empty() || MISSING_MARKERS.contains(&s) {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        match s {
            "True" | "true" => CellValue::Bool(true),
            "False" | "false" => CellValue::Bool(false),
            _ => CellValue::String(s.to_string()),
        }
    }

    /// Read a raw CSV field as text, keeping its exact spelling.
    pub fn text(s: &str) -> CellValue {
        let s = s.trim();
        if s.is_empty() || MISSING_MARKERS.contains(&s) {
            CellValue::Null
        } else {
            CellValue::String(s.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text form used for identifiers and labels: `track_id` values that
    /// happen to look numeric still compare by their text.
    pub fn as_key(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// TrackTable – column-oriented track data
// ---------------------------------------------------------------------------

/// The loaded dataset, one `Vec<CellValue>` per column.
///
/// Raw (freshly parsed) and cleaned tables share this type; only
/// [`crate::data::clean::clean`] establishes the no-missing / unique-id
/// invariants. Tables are never mutated after construction: every
/// transformation builds a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTable {
    column_names: Vec<String>,
    columns: Vec<Vec<CellValue>>,
}

impl TrackTable {
    /// Build a table from row-major records. Short rows are padded with
    /// `Null`, long rows truncated.
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = column_names.len();
        let mut columns: Vec<Vec<CellValue>> =
            (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.push(cells.next().unwrap_or(CellValue::Null));
            }
        }
        TrackTable {
            column_names,
            columns,
        }
    }

    /// Number of tracks (rows).
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<&[CellValue]> {
        self.column_index(name).map(|i| self.columns[i].as_slice())
    }

    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        &self.columns[column][row]
    }

    /// Check that every column the pipeline reads is present.
    pub fn require_columns(&self) -> Result<()> {
        for name in required_columns() {
            if self.column_index(name).is_none() {
                return Err(PipelineError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// A new table with the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> TrackTable {
        let columns = self
            .columns
            .iter()
            .map(|col| indices.iter().map(|&i| col[i].clone()).collect())
            .collect();
        TrackTable {
            column_names: self.column_names.clone(),
            columns,
        }
    }

    /// A new table without the columns matching `should_drop`.
    pub fn without_columns(&self, should_drop: impl Fn(&str) -> bool) -> TrackTable {
        let (column_names, columns) = self
            .column_names
            .iter()
            .zip(&self.columns)
            .filter(|(name, _)| !should_drop(name))
            .map(|(name, col)| (name.clone(), col.clone()))
            .unzip();
        TrackTable {
            column_names,
            columns,
        }
    }

    /// Whether any cell of row `row` is missing.
    pub fn row_has_missing(&self, row: usize) -> bool {
        self.columns.iter().any(|col| col[row].is_null())
    }

    /// Genre label per row (`None` for a missing cell).
    pub fn genre_of(&self, row: usize) -> Option<String> {
        self.column(TRACK_GENRE).and_then(|col| col[row].as_key())
    }

    /// Sorted distinct genre labels.
    pub fn distinct_genres(&self) -> Vec<String> {
        let Some(col) = self.column(TRACK_GENRE) else {
            return Vec::new();
        };
        col.iter()
            .filter_map(CellValue::as_key)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether `track_id` values are pairwise distinct.
    pub fn has_unique_track_ids(&self) -> bool {
        let Some(col) = self.column(TRACK_ID) else {
            return true;
        };
        let mut seen = HashSet::with_capacity(col.len());
        col.iter()
            .filter_map(CellValue::as_key)
            .all(|id| seen.insert(id))
    }

    /// Numeric values of `name` at `rows`; non-numeric cells become NaN.
    pub fn numeric_at(&self, name: &str, rows: &[usize]) -> Result<Vec<f64>> {
        let col = self
            .column(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))?;
        Ok(rows
            .iter()
            .map(|&i| col[i].as_f64().unwrap_or(f64::NAN))
            .collect())
    }
}
