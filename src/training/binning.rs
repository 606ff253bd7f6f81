//! Feature binning for histogram-based tree growth

use crate::error::{ForecastError, Result};
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Maps each continuous feature onto at most `max_bins` ordered bins.
///
/// Bin `b` of a feature holds values `v` with `thresholds[b - 1] < v <= thresholds[b]`.
/// NaN values land in bin 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinMapper {
    max_bins: usize,
    thresholds: Vec<Vec<f64>>,
}

impl BinMapper {
    /// Learn per-feature thresholds from training data
    pub fn fit(x: &Array2<f64>, max_bins: usize) -> Result<Self> {
        if !(2..=256).contains(&max_bins) {
            return Err(ForecastError::InvalidParameter {
                name: "max_bins".to_string(),
                value: max_bins.to_string(),
                reason: "must be between 2 and 256".to_string(),
            });
        }
        let thresholds = x
            .axis_iter(Axis(1))
            .map(|column| feature_thresholds(column, max_bins))
            .collect();
        Ok(Self {
            max_bins,
            thresholds,
        })
    }

    pub fn n_features(&self) -> usize {
        self.thresholds.len()
    }

    /// Number of bins actually used by `feature`
    pub fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    /// Upper edge of `bin` for `feature`
    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.thresholds[feature][bin]
    }

    pub fn bin_value(&self, feature: usize, value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        self.thresholds[feature].partition_point(|&t| t < value) as u8
    }

    /// Bin every value of `x`
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<u8>> {
        if x.ncols() != self.n_features() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} features", self.n_features()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(Array2::from_shape_fn(x.dim(), |(r, c)| {
            self.bin_value(c, x[[r, c]])
        }))
    }
}

/// Midpoints between distinct values when they fit, quantile edges otherwise
fn feature_thresholds(column: ArrayView1<f64>, max_bins: usize) -> Vec<f64> {
    let mut values: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    values.sort_by(|a, b| a.total_cmp(b));

    let mut distinct = values.clone();
    distinct.dedup();

    if distinct.len() <= max_bins {
        return distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();
    }

    let n = values.len();
    let mut thresholds: Vec<f64> = (1..max_bins)
        .map(|q| {
            let pos = q as f64 * (n - 1) as f64 / max_bins as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            (values[lo] + values[hi]) / 2.0
        })
        .collect();
    thresholds.dedup();
    thresholds
}
