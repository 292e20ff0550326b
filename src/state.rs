use std::path::PathBuf;
use std::sync::Arc;

use music_dashboard::config::PipelineConfig;
use music_dashboard::data::correlation::CorrelationOutcome;
use music_dashboard::data::filter::{default_selection, GenreSelection};
use music_dashboard::data::model::TrackTable;
use music_dashboard::data::regression::ModelOutcome;
use music_dashboard::data::stats::{GenreAggregate, Histogram};
use music_dashboard::pipeline::{run_pipeline, DashboardParams, TableCache};

// ---------------------------------------------------------------------------
// Pipeline results held between frames
// ---------------------------------------------------------------------------

/// Owned copy of one pipeline run, kept until the parameters change.
pub struct Snapshot {
    pub visible_indices: Vec<usize>,
    pub top_genres: Vec<GenreAggregate>,
    pub histogram: Histogram,
    pub correlation: CorrelationOutcome,
    pub model: ModelOutcome,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: PipelineConfig,

    cache: TableCache,

    /// Cleaned table (None until a load succeeds).
    pub table: Option<Arc<TrackTable>>,

    /// Sorted distinct genres of the loaded table.
    pub all_genres: Vec<String>,

    /// Current genre selection; empty means "all genres".
    pub selected: GenreSelection,

    /// Number of genres in the ranking chart.
    pub top_n: usize,

    /// Results for the current parameters.
    pub snapshot: Option<Snapshot>,

    /// Blocking load failure. While set nothing else is shown.
    pub load_error: Option<String>,

    /// Non-blocking status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: PipelineConfig) -> Self {
        let top_n = config.dashboard.top_n_default;
        let mut state = Self {
            config,
            cache: TableCache::new(),
            table: None,
            all_genres: Vec::new(),
            selected: GenreSelection::new(),
            top_n,
            snapshot: None,
            load_error: None,
            status_message: None,
        };
        state.load();
        state
    }

    /// Load (or fetch from the cache) the configured archive.
    pub fn load(&mut self) {
        match self.cache.get_or_load(&self.config) {
            Ok(table) => {
                log::info!(
                    "Loaded {} tracks with columns {:?}",
                    table.len(),
                    table.column_names()
                );
                self.all_genres = table.distinct_genres();
                self.selected = default_selection(&table, self.config.dashboard.default_genre_count);
                self.table = Some(table);
                self.load_error = None;
                self.refresh();
            }
            Err(e) => {
                log::error!("Failed to load dataset: {e}");
                self.table = None;
                self.snapshot = None;
                self.all_genres.clear();
                self.load_error = Some(e.to_string());
            }
        }
    }

    /// Replace the dataset with another archive.
    pub fn open_archive(&mut self, path: PathBuf) {
        self.config.archive = path;
        self.cache.clear();
        self.load();
    }

    /// Current parameters, with top-N clamped to the configured range.
    pub fn params(&self) -> DashboardParams {
        DashboardParams::new(self.selected.clone(), self.top_n, &self.config.dashboard)
    }

    /// Re-run the pipeline for the current parameters.
    pub fn refresh(&mut self) {
        let Some(table) = self.table.clone() else {
            return;
        };
        let params = self.params();
        match run_pipeline(&table, &params, &self.config) {
            Ok(out) => {
                self.snapshot = Some(Snapshot {
                    visible_indices: out.filtered.indices().to_vec(),
                    top_genres: out.top_genres,
                    histogram: out.histogram,
                    correlation: out.correlation,
                    model: out.model,
                });
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Pipeline failed: {e}");
                self.snapshot = None;
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Toggle a single genre in the selection.
    pub fn toggle_genre(&mut self, genre: &str) {
        if !self.selected.remove(genre) {
            self.selected.insert(genre.to_string());
        }
        self.refresh();
    }

    /// Select every genre.
    pub fn select_all(&mut self) {
        self.selected = self.all_genres.iter().cloned().collect();
        self.refresh();
    }

    /// Clear the selection, which shows every genre unfiltered.
    pub fn select_none(&mut self) {
        self.selected.clear();
        self.refresh();
    }

    pub fn set_top_n(&mut self, top_n: usize) {
        if top_n != self.top_n {
            self.top_n = top_n;
            self.refresh();
        }
    }
}
