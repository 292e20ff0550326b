use std::collections::HashSet;

use log::info;

use super::model::{TrackTable, TRACK_ID};

/// Whether `name` is the index column a CSV round-trip leaves behind
/// (`Unnamed: 0`, or a blank header).
pub fn is_index_artifact(name: &str) -> bool {
    let name = name.trim();
    if name.is_empty() {
        return true;
    }
    name.strip_prefix("Unnamed: ")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Turn a raw table into a cleaned one.
///
/// Steps run in this order:
/// 1. drop index-artifact columns,
/// 2. drop rows with any missing cell,
/// 3. keep the first row for each `track_id`.
///
/// Running it on its own output returns an equal table.
pub fn clean(raw: &TrackTable) -> TrackTable {
    let trimmed = raw.without_columns(is_index_artifact);

    let complete: Vec<usize> = (0..trimmed.len())
        .filter(|&row| !trimmed.row_has_missing(row))
        .collect();

    let keep = match trimmed.column(TRACK_ID) {
        Some(ids) => {
            let mut seen = HashSet::with_capacity(complete.len());
            complete
                .into_iter()
                .filter(|&row| ids[row].as_key().is_some_and(|id| seen.insert(id)))
                .collect()
        }
        None => complete,
    };

    let cleaned = trimmed.take_rows(&keep);
    info!(
        "Cleaned table: {} -> {} rows ({} columns)",
        raw.len(),
        cleaned.len(),
        cleaned.column_names().len()
    );
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    fn raw() -> TrackTable {
        TrackTable::from_rows(
            vec!["Unnamed: 0".into(), TRACK_ID.into(), "track_genre".into(), "popularity".into()],
            vec![
                vec![CellValue::Integer(0), s("a"), s("pop"), CellValue::Integer(10)],
                vec![CellValue::Integer(1), s("b"), s("pop"), CellValue::Null],
                vec![CellValue::Integer(2), s("a"), s("rock"), CellValue::Integer(99)],
                vec![CellValue::Integer(3), s("c"), s("rock"), CellValue::Integer(30)],
                vec![CellValue::Integer(4), s("c"), s("jazz"), CellValue::Integer(31)],
            ],
        )
    }

    #[test]
    fn artifact_pattern() {
        assert!(is_index_artifact("Unnamed: 0"));
        assert!(is_index_artifact("Unnamed: 12"));
        assert!(is_index_artifact(""));
        assert!(!is_index_artifact("Unnamed: x"));
        assert!(!is_index_artifact("Unnamed"));
        assert!(!is_index_artifact("track_id"));
    }

    #[test]
    fn drops_artifact_missing_and_duplicates() {
        let cleaned = clean(&raw());
        assert_eq!(cleaned.column_names(), ["track_id", "track_genre", "popularity"]);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned.column("popularity").unwrap()[0], CellValue::Integer(10));
        assert_eq!(cleaned.column("track_genre").unwrap()[1], s("rock"));
        assert!(cleaned.has_unique_track_ids());
        assert!((0..cleaned.len()).all(|r| !cleaned.row_has_missing(r)));
    }

    #[test]
    fn missing_rows_are_dropped_before_deduplication() {
        // The first "x" is incomplete, so the second one survives.
        let table = TrackTable::from_rows(
            vec![TRACK_ID.into(), "popularity".into()],
            vec![
                vec![s("x"), CellValue::Null],
                vec![s("x"), CellValue::Integer(5)],
            ],
        );
        let cleaned = clean(&table);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.column("popularity").unwrap()[0], CellValue::Integer(5));
    }

    #[test]
    fn idempotent() {
        let once = clean(&raw());
        assert_eq!(clean(&once), once);
    }
}
