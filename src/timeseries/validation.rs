//! Valid-window filtering and chronological holdout splitting
//!
//! Both operate on row-index views over a single [`FeatureMatrix`]; the
//! matrix itself is never copied or mutated until a model needs dense input.

use super::features::FeatureMatrix;
use crate::error::{ForecastError, Result};
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, Axis};
use std::ops::Range;

/// Ordered subset of rows of a feature matrix
#[derive(Debug, Clone)]
pub struct SeriesView<'a> {
    matrix: &'a FeatureMatrix,
    rows: Vec<usize>,
}

impl<'a> SeriesView<'a> {
    /// View over every row
    pub fn full(matrix: &'a FeatureMatrix) -> Self {
        Self {
            matrix,
            rows: (0..matrix.n_rows()).collect(),
        }
    }

    pub fn matrix(&self) -> &'a FeatureMatrix {
        self.matrix
    }

    /// Underlying row positions, ascending
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sub-view by position within this view
    pub fn slice(&self, range: Range<usize>) -> SeriesView<'a> {
        SeriesView {
            matrix: self.matrix,
            rows: self.rows[range].to_vec(),
        }
    }

    /// Keep the rows whose underlying position satisfies `keep`
    pub fn filter(&self, keep: impl Fn(usize) -> bool) -> SeriesView<'a> {
        SeriesView {
            matrix: self.matrix,
            rows: self.rows.iter().copied().filter(|&r| keep(r)).collect(),
        }
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        let all = self.matrix.timestamps();
        self.rows.iter().map(|&r| all[r]).collect()
    }

    /// Dense copy of the feature rows
    pub fn features(&self) -> Array2<f64> {
        self.matrix.values().select(Axis(0), &self.rows)
    }

    /// Dense copy of the selected columns, in the given order
    pub fn features_for(&self, columns: &[usize]) -> Array2<f64> {
        self.features().select(Axis(1), columns)
    }

    pub fn targets(&self) -> Array1<f64> {
        self.matrix.targets().select(Axis(0), &self.rows)
    }
}

/// Drops rows whose lag features are undefined
#[derive(Debug, Clone)]
pub struct WindowFilter {
    lag_columns: Vec<String>,
}

impl WindowFilter {
    pub fn new(lag_columns: Vec<String>) -> Self {
        Self { lag_columns }
    }

    /// Retain rows where every lag column is defined, preserving order
    pub fn apply<'a>(&self, matrix: &'a FeatureMatrix) -> Result<SeriesView<'a>> {
        let positions = self
            .lag_columns
            .iter()
            .map(|name| {
                matrix.column_index(name).ok_or_else(|| {
                    ForecastError::DataError(format!("lag column '{}' not in feature matrix", name))
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let values = matrix.values();
        Ok(SeriesView::full(matrix)
            .filter(|row| positions.iter().all(|&col| !values[[row, col]].is_nan())))
    }
}

/// Train and holdout segments of one view
#[derive(Debug, Clone)]
pub struct Split<'a> {
    pub train: SeriesView<'a>,
    pub holdout: SeriesView<'a>,
}

impl Split<'_> {
    /// Position of the first holdout row within the split view
    pub fn split_index(&self) -> usize {
        self.train.len()
    }
}

/// Position-based train/holdout partition; holdout is the trailing fraction
#[derive(Debug, Clone, Copy)]
pub struct ChronologicalSplitter {
    holdout_fraction: f64,
}

impl ChronologicalSplitter {
    pub fn new(holdout_fraction: f64) -> Result<Self> {
        if !(holdout_fraction > 0.0 && holdout_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter {
                name: "holdout_fraction".to_string(),
                value: holdout_fraction.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        Ok(Self { holdout_fraction })
    }

    /// `floor(n * f)` trailing rows
    pub fn holdout_len(&self, n: usize) -> usize {
        (n as f64 * self.holdout_fraction).floor() as usize
    }

    /// Split without shuffling; an empty holdout is a valid result
    pub fn split<'a>(&self, view: &SeriesView<'a>) -> Split<'a> {
        let n = view.len();
        let split_index = n - self.holdout_len(n);
        Split {
            train: view.slice(0..split_index),
            holdout: view.slice(split_index..n),
        }
    }
}
