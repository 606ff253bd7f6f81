//! Gradient Boosting implementation
//!
//! Histogram-based gradient boosted regression trees with squared-error
//! loss: features are quantile-binned once, each tree is grown best-first on
//! residual histograms, and an optional seeded validation split drives early
//! stopping.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::binning::BinMapper;
use super::decision_tree::{RegressionTree, TreeParams};
use super::models::Regressor;
use crate::error::{ForecastError, Result};

/// Training sets larger than this enable early stopping in `Auto` mode
const AUTO_EARLY_STOPPING_MIN_SAMPLES: usize = 10_000;

/// When to hold out a validation set and stop on stalled improvement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarlyStopping {
    /// Enabled only for large training sets
    #[default]
    Auto,
    Enabled,
    Disabled,
}

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientBoostingConfig {
    /// Maximum number of boosting iterations (trees)
    pub max_iter: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum leaves per tree
    pub max_leaf_nodes: Option<usize>,
    /// Maximum tree depth
    pub max_depth: Option<usize>,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// L2 regularization on leaf values
    pub l2_regularization: f64,
    /// Maximum bins per feature
    pub max_bins: usize,
    pub early_stopping: EarlyStopping,
    /// Fraction of training rows held out for early stopping
    pub validation_fraction: f64,
    /// Iterations without improvement before stopping
    pub n_iter_no_change: usize,
    /// Minimum validation-loss improvement that counts
    pub tol: f64,
    /// Random seed (validation split only)
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            max_iter: 400,
            learning_rate: 0.05,
            max_leaf_nodes: Some(31),
            max_depth: None,
            min_samples_leaf: 20,
            l2_regularization: 1.0,
            max_bins: 255,
            early_stopping: EarlyStopping::Auto,
            validation_fraction: 0.1,
            n_iter_no_change: 10,
            tol: 1e-7,
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| {
            Err(ForecastError::InvalidParameter {
                name: name.to_string(),
                value,
                reason: reason.to_string(),
            })
        };
        if self.max_iter == 0 {
            return invalid("max_iter", "0".into(), "must be at least 1");
        }
        if !(self.learning_rate > 0.0) {
            return invalid("learning_rate", self.learning_rate.to_string(), "must be positive");
        }
        if let Some(leaves) = self.max_leaf_nodes {
            if leaves < 2 {
                return invalid("max_leaf_nodes", leaves.to_string(), "must be at least 2");
            }
        }
        if self.max_depth == Some(0) {
            return invalid("max_depth", "0".into(), "must be at least 1");
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf", "0".into(), "must be at least 1");
        }
        if !(self.l2_regularization >= 0.0) {
            return invalid(
                "l2_regularization",
                self.l2_regularization.to_string(),
                "must be non-negative",
            );
        }
        if !(2..=255).contains(&self.max_bins) {
            return invalid("max_bins", self.max_bins.to_string(), "must be between 2 and 255");
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return invalid(
                "validation_fraction",
                self.validation_fraction.to_string(),
                "must lie strictly between 0 and 1",
            );
        }
        if self.n_iter_no_change == 0 {
            return invalid("n_iter_no_change", "0".into(), "must be at least 1");
        }
        if !(self.tol >= 0.0) {
            return invalid("tol", self.tol.to_string(), "must be non-negative");
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_leaf_nodes: self.max_leaf_nodes,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            l2_regularization: self.l2_regularization,
            shrinkage: self.learning_rate,
        }
    }
}

/// Gradient Boosting Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: GradientBoostingConfig,
    trees: Vec<RegressionTree>,
    initial_prediction: f64,
    n_features: usize,
    feature_importances: Vec<f64>,
    /// Validation loss per iteration (index 0 = before the first tree)
    validation_loss: Vec<f64>,
    is_fitted: bool,
}

impl GradientBoostingRegressor {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            n_features: 0,
            feature_importances: Vec::new(),
            validation_loss: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Fit the gradient boosting model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ForecastError::TrainingError(
                "cannot fit on an empty training set".to_string(),
            ));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::TrainingError(
                "target contains non-finite values".to_string(),
            ));
        }

        let use_early_stopping = n_samples >= 2
            && match self.config.early_stopping {
                EarlyStopping::Auto => n_samples > AUTO_EARLY_STOPPING_MIN_SAMPLES,
                EarlyStopping::Enabled => true,
                EarlyStopping::Disabled => false,
            };

        let (train_rows, val_rows) = if use_early_stopping {
            self.validation_split(n_samples)
        } else {
            ((0..n_samples).collect(), Vec::new())
        };

        let x_train = x.select(Axis(0), &train_rows);
        let y_train = y.select(Axis(0), &train_rows);
        let x_val = x.select(Axis(0), &val_rows);
        let y_val = y.select(Axis(0), &val_rows);

        let mapper = BinMapper::fit(&x_train, self.config.max_bins)?;
        let binned = mapper.transform(&x_train)?;
        let params = self.config.tree_params();

        self.trees.clear();
        self.validation_loss.clear();
        self.n_features = n_features;
        self.feature_importances = vec![0.0; n_features];

        // Initialize with mean
        self.initial_prediction = y_train.mean().unwrap_or(0.0);
        let mut predictions = Array1::from_elem(y_train.len(), self.initial_prediction);
        let mut val_predictions = Array1::from_elem(y_val.len(), self.initial_prediction);
        if use_early_stopping {
            self.validation_loss.push(half_squared_error(&y_val, &val_predictions));
        }

        for iteration in 0..self.config.max_iter {
            let residuals: Vec<f64> = y_train
                .iter()
                .zip(predictions.iter())
                .map(|(yi, pi)| yi - pi)
                .collect();

            let tree = RegressionTree::grow(&binned, &mapper, &residuals, &params);

            for (i, row) in binned.rows().into_iter().enumerate() {
                predictions[i] += tree.predict_binned_row(row);
            }
            for (imp, gain) in self.feature_importances.iter_mut().zip(tree.feature_gains()) {
                *imp += gain;
            }

            let single_leaf = tree.n_leaves() == 1;
            if use_early_stopping {
                for (i, row) in x_val.rows().into_iter().enumerate() {
                    val_predictions[i] += tree.predict_row(row);
                }
                self.validation_loss.push(half_squared_error(&y_val, &val_predictions));
            }
            self.trees.push(tree);

            if single_leaf {
                debug!(iteration, "no split improves the loss; stopping");
                break;
            }
            if use_early_stopping && self.should_stop() {
                debug!(iteration, "validation loss stalled; stopping");
                break;
            }
        }

        // Normalize feature importances
        let total: f64 = self.feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= total;
            }
        }

        debug!(
            n_iter = self.trees.len(),
            n_train = train_rows.len(),
            n_validation = val_rows.len(),
            "gradient boosting fitted"
        );
        self.is_fitted = true;
        Ok(())
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(ForecastError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ForecastError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .fold(self.initial_prediction, |acc, tree| acc + tree.predict_row(row))
            })
            .collect())
    }

    /// Number of boosting iterations actually run
    pub fn n_iter(&self) -> usize {
        self.trees.len()
    }

    /// Get feature importances (normalised split gain)
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn validation_loss(&self) -> &[f64] {
        &self.validation_loss
    }

    /// Shuffled (seeded) holdout of `validation_fraction` rows; both index lists sorted
    fn validation_split(&self, n: usize) -> (Vec<usize>, Vec<usize>) {
        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        let n_val = ((n as f64 * self.config.validation_fraction).ceil() as usize).clamp(1, n - 1);

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);
        let mut val = indices[..n_val].to_vec();
        let mut train = indices[n_val..].to_vec();
        val.sort_unstable();
        train.sort_unstable();
        (train, val)
    }

    /// True when none of the last `n_iter_no_change` losses beat the reference by `tol`
    fn should_stop(&self) -> bool {
        let k = self.config.n_iter_no_change;
        let history = &self.validation_loss;
        if history.len() <= k {
            return false;
        }
        let reference = history[history.len() - 1 - k];
        !history[history.len() - k..]
            .iter()
            .any(|&loss| loss < reference - self.config.tol)
    }
}

impl Regressor for GradientBoostingRegressor {
    fn name(&self) -> &'static str {
        "gradient_boosting"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GradientBoostingRegressor::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GradientBoostingRegressor::predict(self, x)
    }
}

fn half_squared_error(y: &Array1<f64>, pred: &Array1<f64>) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    0.5 * y
        .iter()
        .zip(pred.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        / y.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_regression_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| ((i * (j + 3)) % 97) as f64 * 0.1);
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| row[0] * 2.0 + (row[1] * 0.5).sin() * 3.0 + 1.0)
            .collect();
        (x, y)
    }

    fn small_config() -> GradientBoostingConfig {
        GradientBoostingConfig {
            max_iter: 50,
            learning_rate: 0.1,
            min_samples_leaf: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_gradient_boosting_regressor() {
        let (x, y) = create_regression_data(300);
        let mut model = GradientBoostingRegressor::new(small_config());
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions.len(), 300);

        let mse: f64 = y
            .iter()
            .zip(predictions.iter())
            .map(|(yi, pi)| (yi - pi).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        let y_var = y.var(0.0);
        assert!(mse < 0.1 * y_var, "MSE ({}) should be well below variance ({})", mse, y_var);
    }

    #[test]
    fn test_fit_is_reproducible() {
        let (x, y) = create_regression_data(200);
        let config = GradientBoostingConfig {
            early_stopping: EarlyStopping::Enabled,
            ..small_config()
        };
        let mut a = GradientBoostingRegressor::new(config.clone());
        let mut b = GradientBoostingRegressor::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        let pa = a.predict(&x).unwrap();
        let pb = b.predict(&x).unwrap();
        assert!(pa.iter().zip(pb.iter()).all(|(p, q)| p.to_bits() == q.to_bits()));
        assert_eq!(a.n_iter(), b.n_iter());
    }

    #[test]
    fn test_early_stopping_records_validation_loss() {
        let (x, y) = create_regression_data(200);
        let config = GradientBoostingConfig {
            early_stopping: EarlyStopping::Enabled,
            ..small_config()
        };
        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.validation_loss().len(), model.n_iter() + 1);
        assert!(model.validation_loss().last().unwrap() < &model.validation_loss()[0]);
    }

    #[test]
    fn test_too_few_rows_to_split_still_fits() {
        let (x, y) = create_regression_data(21);
        let mut model = GradientBoostingRegressor::new(GradientBoostingConfig::default());
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_iter(), 1);
        let mean = y.mean().unwrap();
        for p in model.predict(&x).unwrap() {
            assert!((p - mean).abs() < 1e-9);
        }
    }

    #[test]
    fn test_feature_importances() {
        let (x, y) = create_regression_data(300);
        let mut model = GradientBoostingRegressor::new(small_config());
        model.fit(&x, &y).unwrap();

        let importances = model.feature_importances();
        assert_eq!(importances.len(), 2);
        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 0.01, "Sum of importances ({}) should be ~1", sum);
    }

    #[test]
    fn test_predict_before_fit() {
        let model = GradientBoostingRegressor::new(GradientBoostingConfig::default());
        assert!(matches!(
            model.predict(&Array2::zeros((1, 2))),
            Err(ForecastError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_wrong_feature_count() {
        let (x, y) = create_regression_data(50);
        let mut model = GradientBoostingRegressor::new(small_config());
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&Array2::zeros((1, 3))).is_err());
    }

    #[test]
    fn test_config_validation() {
        let bad = GradientBoostingConfig {
            learning_rate: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = GradientBoostingConfig {
            max_bins: 300,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert!(GradientBoostingConfig::default().validate().is_ok());
    }
}
