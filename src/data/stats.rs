use std::collections::HashMap;

use serde::Serialize;

use super::filter::FilteredView;
use super::model::POPULARITY;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Genre ranking
// ---------------------------------------------------------------------------

/// Mean popularity of one genre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreAggregate {
    pub genre: String,
    pub mean_popularity: f64,
    pub tracks: usize,
}

/// Rank genres by mean popularity, highest first, and keep the first `n`.
///
/// The sort is stable, so genres with equal means stay in the order they
/// were first seen. Returns `min(n, distinct genres)` entries.
pub fn top_genres(view: &FilteredView<'_>, n: usize) -> Result<Vec<GenreAggregate>> {
    let popularity = view.numeric(POPULARITY)?;

    // (genre, sum, count) in first-encounter order.
    let mut groups: Vec<(String, f64, usize)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    for (genre, value) in view.genres().zip(popularity) {
        let Some(genre) = genre else { continue };
        let slot = *slots.entry(genre.clone()).or_insert_with(|| {
            groups.push((genre, 0.0, 0));
            groups.len() - 1
        });
        groups[slot].1 += value;
        groups[slot].2 += 1;
    }

    let mut ranked: Vec<GenreAggregate> = groups
        .into_iter()
        .map(|(genre, sum, tracks)| GenreAggregate {
            genre,
            mean_popularity: sum / tracks as f64,
            tracks,
        })
        .collect();
    ranked.sort_by(|a, b| b.mean_popularity.total_cmp(&a.mean_popularity));
    ranked.truncate(n);
    Ok(ranked)
}

// ---------------------------------------------------------------------------
// Popularity histogram
// ---------------------------------------------------------------------------

/// Equal-width histogram of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges, ascending.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width buckets spanning their range.
    /// The last bucket is closed on the right. NaN values are ignored.
    pub fn from_values(values: &[f64], bins: usize) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() || bins == 0 {
            return Histogram {
                edges: Vec::new(),
                counts: Vec::new(),
            };
        }

        let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // A single distinct value gets a unit-wide range centred on it.
        let (min, max) = if (max - min).abs() < f64::EPSILON {
            (min - 0.5, min + 0.5)
        } else {
            (min, max)
        };
        Self::bin(&finite, bins, min, max)
    }

    fn bin(values: &[f64], bins: usize, min: f64, max: f64) -> Self {
        let width = (max - min) / bins as f64;
        let edges = (0..=bins).map(|i| min + width * i as f64).collect();
        let mut counts = vec![0usize; bins];
        for &v in values {
            let slot = (((v - min) / width) as usize).min(bins - 1);
            counts[slot] += 1;
        }
        Histogram { edges, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Distribution of popularity over the visible rows.
pub fn popularity_histogram(view: &FilteredView<'_>, bins: usize) -> Result<Histogram> {
    Ok(Histogram::from_values(&view.numeric(POPULARITY)?, bins))
}
