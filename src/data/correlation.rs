use log::warn;
use serde::Serialize;

use super::filter::FilteredView;
use super::model::NUMERIC_COLUMNS;
use crate::config::DegeneratePolicy;
use crate::error::{PipelineError, Result};

/// Pearson correlation between every pair of the numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    /// Row-major, `labels.len()` × `labels.len()`. NaN marks a pair that
    /// involves a zero-variance column.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }
}

/// Result of correlating one view. Under [`DegeneratePolicy::Error`] a
/// zero-variance column makes the matrix unavailable without affecting the
/// other stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrelationOutcome {
    Computed(CorrelationMatrix),
    Unavailable { reason: String },
}

impl CorrelationOutcome {
    pub fn matrix(&self) -> Option<&CorrelationMatrix> {
        match self {
            CorrelationOutcome::Computed(m) => Some(m),
            CorrelationOutcome::Unavailable { .. } => None,
        }
    }
}

/// Like [`correlation_matrix`], but a degenerate column becomes
/// [`CorrelationOutcome::Unavailable`] instead of an error.
pub fn correlate(view: &FilteredView<'_>, policy: DegeneratePolicy) -> Result<CorrelationOutcome> {
    match correlation_matrix(view, policy) {
        Ok(matrix) => Ok(CorrelationOutcome::Computed(matrix)),
        Err(PipelineError::InsufficientData(reason)) => {
            warn!("Correlation matrix unavailable: {reason}");
            Ok(CorrelationOutcome::Unavailable { reason })
        }
        Err(e) => Err(e),
    }
}

/// Correlate popularity and the nine audio features over the visible rows.
pub fn correlation_matrix(
    view: &FilteredView<'_>,
    policy: DegeneratePolicy,
) -> Result<CorrelationMatrix> {
    let columns = NUMERIC_COLUMNS
        .iter()
        .map(|name| view.numeric(name))
        .collect::<Result<Vec<_>>>()?;
    let labels = NUMERIC_COLUMNS.iter().map(|s| s.to_string()).collect();
    pearson_matrix(labels, &columns, policy)
}

/// Build a correlation matrix from equally long columns.
pub fn pearson_matrix(
    labels: Vec<String>,
    columns: &[Vec<f64>],
    policy: DegeneratePolicy,
) -> Result<CorrelationMatrix> {
    let k = columns.len();
    let centered: Vec<Option<Vec<f64>>> = columns.iter().map(|c| center(c)).collect();

    if policy == DegeneratePolicy::Error {
        if let Some(i) = centered.iter().position(Option::is_none) {
            return Err(PipelineError::InsufficientData(format!(
                "column '{}' has zero variance",
                labels.get(i).map_or("?", String::as_str)
            )));
        }
    }

    let mut values = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        let Some(a) = &centered[i] else { continue };
        values[i][i] = 1.0;
        for j in (i + 1)..k {
            let Some(b) = &centered[j] else { continue };
            let r = dot(a, b) / (dot(a, a).sqrt() * dot(b, b).sqrt());
            let r = r.clamp(-1.0, 1.0);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    Ok(CorrelationMatrix { labels, values })
}

/// Subtract the mean; `None` when the column cannot be correlated
/// (fewer than two values, or all values equal).
fn center(values: &[f64]) -> Option<Vec<f64>> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let centered: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let ss = dot(&centered, &centered);
    (ss.is_finite() && ss > 0.0).then_some(centered)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
