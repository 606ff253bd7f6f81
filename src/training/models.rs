//! Regressor trait, MAE and the persisted model enum

use super::gradient_boosting::GradientBoostingRegressor;
use super::linear_models::LinearRegression;
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Trait for regression models
pub trait Regressor: Send + Sync {
    /// Short identifier used in logs and reports
    fn name(&self) -> &'static str;

    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Mean absolute error; `None` for empty input
pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Option<f64>> {
    if y_true.len() != y_pred.len() {
        return Err(ForecastError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Ok(None);
    }
    let total: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum();
    Ok(Some(total / y_true.len() as f64))
}

/// A fitted model that can be persisted in a model bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum TrainedModel {
    LinearRegression(LinearRegression),
    GradientBoosting(GradientBoostingRegressor),
}

impl TrainedModel {
    fn inner(&self) -> &dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::GradientBoosting(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Regressor {
        match self {
            TrainedModel::LinearRegression(m) => m,
            TrainedModel::GradientBoosting(m) => m,
        }
    }
}

impl Regressor for TrainedModel {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }
}

impl From<GradientBoostingRegressor> for TrainedModel {
    fn from(model: GradientBoostingRegressor) -> Self {
        TrainedModel::GradientBoosting(model)
    }
}

impl From<LinearRegression> for TrainedModel {
    fn from(model: LinearRegression) -> Self {
        TrainedModel::LinearRegression(model)
    }
}
