use std::sync::{Arc, OnceLock};

use log::{debug, info};
use serde::Serialize;

use crate::config::{DashboardConfig, PipelineConfig, RankingScope};
use crate::data::clean::clean;
use crate::data::correlation::{correlate, CorrelationOutcome};
use crate::data::filter::{filter_by_genre, FilteredView, GenreSelection};
use crate::data::loader::load_archive;
use crate::data::model::TrackTable;
use crate::data::regression::{evaluate_model, ModelOutcome};
use crate::data::stats::{popularity_histogram, top_genres, GenreAggregate, Histogram};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Cached cleaned table
// ---------------------------------------------------------------------------

/// Load the archive named by `config` and clean it.
pub fn load_clean(config: &PipelineConfig) -> Result<TrackTable> {
    let raw = load_archive(&config.archive, config)?;
    let cleaned = clean(&raw);
    cleaned.require_columns()?;
    Ok(cleaned)
}

/// Holds the cleaned table once it has been loaded.
///
/// The table is written on first access and only read afterwards. It goes
/// away only through [`TableCache::clear`], e.g. when another archive is
/// opened.
#[derive(Debug, Default)]
pub struct TableCache {
    cell: OnceLock<Arc<TrackTable>>,
}

impl TableCache {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// The cached table, if one has been loaded.
    pub fn get(&self) -> Option<Arc<TrackTable>> {
        self.cell.get().cloned()
    }

    /// The cached table, loading and cleaning it on first access.
    ///
    /// A failed load leaves the cache empty, so the next call retries.
    pub fn get_or_load(&self, config: &PipelineConfig) -> Result<Arc<TrackTable>> {
        if let Some(table) = self.cell.get() {
            return Ok(Arc::clone(table));
        }
        let table = Arc::new(load_clean(config)?);
        info!("Cached cleaned table with {} tracks", table.len());
        Ok(Arc::clone(self.cell.get_or_init(|| table)))
    }

    pub fn clear(&mut self) {
        if self.cell.take().is_some() {
            debug!("Cleared cached table");
        }
    }
}

// ---------------------------------------------------------------------------
// Per-interaction pipeline
// ---------------------------------------------------------------------------

/// The inputs a user can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardParams {
    pub genres: GenreSelection,
    pub top_n: usize,
}

impl DashboardParams {
    /// Build parameters with `top_n` clamped to the configured range.
    pub fn new(genres: GenreSelection, top_n: usize, config: &DashboardConfig) -> Self {
        Self {
            genres,
            top_n: top_n.clamp(config.top_n_min, config.top_n_max),
        }
    }
}

/// Everything the dashboard displays for one set of parameters.
#[derive(Debug, Clone)]
pub struct DashboardOutput<'a> {
    pub filtered: FilteredView<'a>,
    pub top_genres: Vec<GenreAggregate>,
    pub histogram: Histogram,
    pub correlation: CorrelationOutcome,
    pub model: ModelOutcome,
}

/// Run filter → {rank, histogram, correlate, model} for one interaction.
///
/// Only a failure to read the table stops the run; a degenerate correlation
/// or too few rows for the model are reported in their own outcome.
pub fn run_pipeline<'a>(
    table: &'a TrackTable,
    params: &DashboardParams,
    config: &PipelineConfig,
) -> Result<DashboardOutput<'a>> {
    let filtered = filter_by_genre(table, &params.genres);
    debug!(
        "Recomputing for {} genre(s): {} of {} rows visible",
        params.genres.len(),
        filtered.len(),
        table.len()
    );

    let top_genres = match config.dashboard.ranking_scope {
        RankingScope::Filtered => top_genres(&filtered, params.top_n)?,
        RankingScope::Full => top_genres(&FilteredView::all(table), params.top_n)?,
    };
    let histogram = popularity_histogram(&filtered, config.dashboard.histogram_bins)?;
    let correlation = correlate(&filtered, config.correlation_policy)?;
    let model = evaluate_model(&filtered, &config.model)?;

    Ok(DashboardOutput {
        filtered,
        top_genres,
        histogram,
        correlation,
        model,
    })
}

// ---------------------------------------------------------------------------
// Serializable summary
// ---------------------------------------------------------------------------

/// Owned, serializable form of a [`DashboardOutput`].
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub genres: Vec<String>,
    pub top_genres: Vec<GenreAggregate>,
    pub histogram: Histogram,
    pub correlation: CorrelationOutcome,
    pub model: ModelOutcome,
}

impl DashboardOutput<'_> {
    pub fn report(&self, params: &DashboardParams) -> DashboardReport {
        DashboardReport {
            total_rows: self.filtered.table().len(),
            filtered_rows: self.filtered.len(),
            genres: params.genres.iter().cloned().collect(),
            top_genres: self.top_genres.clone(),
            histogram: self.histogram.clone(),
            correlation: self.correlation.clone(),
            model: self.model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DegeneratePolicy;
    use crate::data::model::{CellValue, AUDIO_FEATURES, POPULARITY, TRACK_GENRE, TRACK_ID};

    fn table() -> TrackTable {
        let mut names = vec![TRACK_ID.to_string(), TRACK_GENRE.to_string(), POPULARITY.to_string()];
        names.extend(AUDIO_FEATURES.iter().map(|s| s.to_string()));
        let rows = (0..30)
            .map(|i| {
                let genre = ["pop", "rock", "jazz"][i % 3];
                let mut row = vec![
                    CellValue::String(format!("t{i}")),
                    CellValue::String(genre.into()),
                    CellValue::Integer((i * 3 % 100) as i64),
                ];
                row.extend((0..AUDIO_FEATURES.len()).map(|j| CellValue::Float(((i * (j + 2)) % 17) as f64)));
                row
            })
            .collect();
        TrackTable::from_rows(names, rows)
    }

    #[test]
    fn params_clamp_top_n() {
        let config = DashboardConfig::default();
        assert_eq!(DashboardParams::new(GenreSelection::new(), 1, &config).top_n, 5);
        assert_eq!(DashboardParams::new(GenreSelection::new(), 50, &config).top_n, 20);
        assert_eq!(DashboardParams::new(GenreSelection::new(), 12, &config).top_n, 12);
    }

    #[test]
    fn narrow_filter_skips_model_but_not_other_stages() {
        let t = table();
        let config = PipelineConfig::default();
        let params = DashboardParams::new(["jazz".to_string()].into(), 10, &config.dashboard);
        let out = run_pipeline(&t, &params, &config).unwrap();
        assert_eq!(out.filtered.len(), 10);
        assert!(matches!(out.model, ModelOutcome::InsufficientData { rows: 10, .. }));
        assert_eq!(out.top_genres.len(), 1);
        assert_eq!(out.histogram.total(), 10);
        assert_eq!(out.correlation.matrix().map(|m| m.size()), Some(10));
    }

    #[test]
    fn degenerate_correlation_leaves_other_stages_intact() {
        // Instrumentalness is constant across the ten jazz tracks.
        let base = table();
        let col = base.column_index("instrumentalness").unwrap();
        let rows: Vec<Vec<CellValue>> = (0..base.len())
            .map(|r| {
                (0..base.column_names().len())
                    .map(|c| {
                        if c == col && base.genre_of(r).as_deref() == Some("jazz") {
                            CellValue::Float(0.0)
                        } else {
                            base.cell(r, c).clone()
                        }
                    })
                    .collect()
            })
            .collect();
        let t = TrackTable::from_rows(base.column_names().to_vec(), rows);

        let config = PipelineConfig {
            correlation_policy: DegeneratePolicy::Error,
            ..PipelineConfig::default()
        };
        let params = DashboardParams::new(["jazz".to_string()].into(), 10, &config.dashboard);
        let out = run_pipeline(&t, &params, &config).unwrap();
        match &out.correlation {
            CorrelationOutcome::Unavailable { reason } => assert!(reason.contains("instrumentalness")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(out.top_genres.len(), 1);
        assert_eq!(out.top_genres[0].genre, "jazz");
        assert_eq!(out.histogram.total(), 10);
        assert!(matches!(out.model, ModelOutcome::InsufficientData { rows: 10, .. }));

        let json = serde_json::to_value(out.report(&params)).unwrap();
        assert_eq!(json["correlation"]["status"], "unavailable");

        // The same filter under the NaN policy still yields a matrix.
        let lenient = PipelineConfig::default();
        let out = run_pipeline(&t, &params, &lenient).unwrap();
        let m = out.correlation.matrix().unwrap();
        let i = m.labels.iter().position(|l| l == "instrumentalness").unwrap();
        assert!(m.get(i, i).is_nan());
    }

    #[test]
    fn full_ranking_scope_ignores_filter() {
        let t = table();
        let mut config = PipelineConfig::default();
        config.dashboard.ranking_scope = RankingScope::Full;
        let params = DashboardParams::new(["jazz".to_string()].into(), 10, &config.dashboard);
        let out = run_pipeline(&t, &params, &config).unwrap();
        assert_eq!(out.top_genres.len(), 3);
    }

    #[test]
    fn report_serializes_nan_as_null() {
        let t = table();
        let config = PipelineConfig::default();
        let params = DashboardParams::new(GenreSelection::new(), 5, &config.dashboard);
        let out = run_pipeline(&t, &params, &config).unwrap();
        let mut report = out.report(&params);
        let CorrelationOutcome::Computed(matrix) = &mut report.correlation else {
            panic!("expected a correlation matrix");
        };
        matrix.values[0][1] = f64::NAN;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["correlation"]["status"], "computed");
        assert!(json["correlation"]["values"][0][1].is_null());
        assert_eq!(json["model"]["status"], "fitted");
        assert_eq!(json["total_rows"], 30);
    }

    #[test]
    fn empty_cache_reports_missing_archive_and_stays_empty() {
        let cache = TableCache::new();
        let config = PipelineConfig {
            archive: "definitely/not/here.zip".into(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            cache.get_or_load(&config),
            Err(crate::error::PipelineError::ResourceNotFound(_))
        ));
        assert!(cache.get().is_none());
    }
}
