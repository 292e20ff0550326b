use std::collections::BTreeSet;

use super::model::{TrackTable, TRACK_GENRE};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Genre selection
// ---------------------------------------------------------------------------

/// Selected genre labels. An empty selection means "no filter" (show all).
pub type GenreSelection = BTreeSet<String>;

/// The start-up selection: the first `count` genres in sorted order.
pub fn default_selection(table: &TrackTable, count: usize) -> GenreSelection {
    table.distinct_genres().into_iter().take(count).collect()
}

// ---------------------------------------------------------------------------
// FilteredView – read-only row subset
// ---------------------------------------------------------------------------

/// A read-only subset of a [`TrackTable`], stored as row indices in
/// original order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a TrackTable,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// A view over every row.
    pub fn all(table: &'a TrackTable) -> Self {
        Self {
            table,
            indices: (0..table.len()).collect(),
        }
    }

    pub fn table(&self) -> &'a TrackTable {
        self.table
    }

    /// Row indices into the underlying table.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Genre of each visible row, in order.
    pub fn genres(&self) -> impl Iterator<Item = Option<String>> + '_ {
        self.indices.iter().map(|&i| self.table.genre_of(i))
    }

    /// Values of a numeric column for the visible rows.
    pub fn numeric(&self, column: &str) -> Result<Vec<f64>> {
        self.table.numeric_at(column, &self.indices)
    }

    /// Copy the visible rows into a standalone table.
    pub fn materialize(&self) -> TrackTable {
        self.table.take_rows(&self.indices)
    }
}

/// Restrict `table` to rows whose genre is in `selected`.
///
/// An empty selection returns every row.
pub fn filter_by_genre<'a>(table: &'a TrackTable, selected: &GenreSelection) -> FilteredView<'a> {
    if selected.is_empty() {
        return FilteredView::all(table);
    }
    let Some(genres) = table.column(TRACK_GENRE) else {
        return FilteredView {
            table,
            indices: Vec::new(),
        };
    };
    let indices = genres
        .iter()
        .enumerate()
        .filter(|(_, g)| g.as_key().is_some_and(|g| selected.contains(&g)))
        .map(|(i, _)| i)
        .collect();
    FilteredView { table, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    fn table() -> TrackTable {
        TrackTable::from_rows(
            vec!["track_id".into(), TRACK_GENRE.into()],
            [("a", "pop"), ("b", "rock"), ("c", "jazz"), ("d", "pop"), ("e", "rock")]
                .iter()
                .map(|(id, g)| vec![CellValue::String(id.to_string()), CellValue::String(g.to_string())])
                .collect(),
        )
    }

    #[test]
    fn empty_selection_is_identity() {
        let t = table();
        let view = filter_by_genre(&t, &GenreSelection::new());
        assert_eq!(view.indices(), &[0, 1, 2, 3, 4]);
        assert_eq!(view.materialize(), t);
    }

    #[test]
    fn keeps_selected_rows_in_order() {
        let t = table();
        let selected: GenreSelection = ["pop", "jazz"].iter().map(|s| s.to_string()).collect();
        let view = filter_by_genre(&t, &selected);
        assert_eq!(view.indices(), &[0, 2, 3]);
        assert!(view.genres().all(|g| g.is_some_and(|g| selected.contains(&g))));
    }

    #[test]
    fn unknown_genre_selects_nothing() {
        let t = table();
        let selected: GenreSelection = ["metal".to_string()].into();
        assert!(filter_by_genre(&t, &selected).is_empty());
    }

    #[test]
    fn default_selection_takes_first_sorted() {
        let t = table();
        let sel = default_selection(&t, 2);
        assert_eq!(sel.into_iter().collect::<Vec<_>>(), vec!["jazz", "pop"]);
    }
}
