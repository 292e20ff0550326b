use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Policy flags
// ---------------------------------------------------------------------------

/// Text encoding of the CSV entry inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// ISO-8859-1: every byte maps to the code point of the same value.
    #[default]
    Latin1,
    Utf8,
}

/// What the loader does with a line it cannot parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Skip the line and keep going.
    #[default]
    Lenient,
    /// Fail the whole load.
    Strict,
}

/// What the correlation engine does with a zero-variance column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Emit NaN for every cell touching the column.
    #[default]
    Nan,
    /// Return `InsufficientData`.
    Error,
}

/// Which table the genre ranking is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RankingScope {
    #[default]
    Filtered,
    Full,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// A view must have strictly more rows than this to be modelled.
    pub min_rows: usize,
    /// Share of rows held out for evaluation.
    pub test_fraction: f64,
    /// Seed for the train/test shuffle.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            min_rows: 10,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub top_n_min: usize,
    pub top_n_max: usize,
    pub top_n_default: usize,
    /// How many genres (in sorted order) are selected on start-up.
    pub default_genre_count: usize,
    pub histogram_bins: usize,
    pub preview_rows: usize,
    pub ranking_scope: RankingScope,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_n_min: 5,
            top_n_max: 20,
            top_n_default: 10,
            default_genre_count: 5,
            histogram_bins: 30,
            preview_rows: 100,
            ranking_scope: RankingScope::Filtered,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Everything the pipeline and dashboard can be tuned with.
///
/// Loaded from TOML; every field has a default so a partial file only
/// overrides what it names:
///
/// ```toml
/// archive = "data/spotify.zip"
/// encoding = "utf8"
///
/// [model]
/// seed = 7
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub archive: PathBuf,
    /// Name of the CSV entry; when unset the archive must hold exactly one file.
    pub entry: Option<String>,
    pub encoding: TextEncoding,
    pub parse_policy: ParsePolicy,
    pub correlation_policy: DegeneratePolicy,
    pub model: ModelConfig,
    pub dashboard: DashboardConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            archive: PathBuf::from("dataset.zip"),
            entry: None,
            encoding: TextEncoding::Latin1,
            parse_policy: ParsePolicy::Lenient,
            correlation_policy: DegeneratePolicy::Nan,
            model: ModelConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.dashboard;
        if d.top_n_min == 0 || d.top_n_min > d.top_n_max {
            return Err(PipelineError::Config(format!(
                "top-N range {}..={} is empty",
                d.top_n_min, d.top_n_max
            )));
        }
        if d.histogram_bins == 0 {
            return Err(PipelineError::Config("histogram_bins must be positive".into()));
        }
        let f = self.model.test_fraction;
        if !(f > 0.0 && f < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_fraction {f} must lie strictly between 0 and 1"
            )));
        }
        Ok(())
    }
}
