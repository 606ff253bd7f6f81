//! Holdout evaluation of a primary regressor against a linear baseline

use super::linear_models::LinearRegression;
use super::models::{mean_absolute_error, Regressor};
use crate::error::Result;
use crate::timeseries::{SeriesView, Split};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Which rows the linear baseline is fitted on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineProtocol {
    /// Fit and score on the holdout rows (in-sample fit quality)
    #[default]
    InSampleHoldout,
    /// Fit on train, score on holdout
    TrainToHoldout,
}

/// Outcome of one evaluation: the fitted primary model and both MAEs
#[derive(Debug, Clone)]
pub struct Evaluation<M> {
    pub model: M,
    pub model_mae: Option<f64>,
    pub baseline_mae: Option<f64>,
    pub n_train: usize,
    pub n_holdout: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    protocol: BaselineProtocol,
}

impl Evaluator {
    pub fn new(protocol: BaselineProtocol) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> BaselineProtocol {
        self.protocol
    }

    /// Fit `model` on the train segment and score it and the baseline on the holdout.
    ///
    /// Primary-model failures propagate; baseline failures degrade to `None`.
    pub fn evaluate<M: Regressor>(&self, mut model: M, split: &Split<'_>) -> Result<Evaluation<M>> {
        let x_train = split.train.features();
        let y_train = split.train.targets();
        let x_holdout = split.holdout.features();
        let y_holdout = split.holdout.targets();

        info!(
            model = model.name(),
            n_train = y_train.len(),
            n_holdout = y_holdout.len(),
            "fitting primary model"
        );
        model.fit(&x_train, &y_train)?;

        let model_mae = if y_holdout.is_empty() {
            None
        } else {
            let predictions = model.predict(&x_holdout)?;
            mean_absolute_error(&y_holdout, &predictions)?
        };

        let baseline_mae = self.baseline_mae(split);
        debug!(?model_mae, ?baseline_mae, "holdout evaluation finished");

        Ok(Evaluation {
            model,
            model_mae,
            baseline_mae,
            n_train: split.train.len(),
            n_holdout: split.holdout.len(),
        })
    }

    /// Linear baseline MAE on the holdout; `None` when it cannot be computed
    pub fn baseline_mae(&self, split: &Split<'_>) -> Option<f64> {
        if split.holdout.is_empty() {
            return None;
        }
        let fit_view: &SeriesView<'_> = match self.protocol {
            BaselineProtocol::InSampleHoldout => &split.holdout,
            BaselineProtocol::TrainToHoldout => &split.train,
        };

        let x_fit = zero_fill(fit_view.features());
        let y_fit = fit_view.targets();
        let x_eval = zero_fill(split.holdout.features());
        let y_eval = split.holdout.targets();

        match fit_and_score(LinearRegression::new(), &x_fit, &y_fit, &x_eval, &y_eval) {
            Ok(mae) => mae,
            Err(e) => {
                warn!(error = %e, "baseline fit failed; recording undefined baseline MAE");
                None
            }
        }
    }
}

fn fit_and_score<R: Regressor>(
    mut regressor: R,
    x_fit: &Array2<f64>,
    y_fit: &Array1<f64>,
    x_eval: &Array2<f64>,
    y_eval: &Array1<f64>,
) -> Result<Option<f64>> {
    regressor.fit(x_fit, y_fit)?;
    let predictions = regressor.predict(x_eval)?;
    mean_absolute_error(y_eval, &predictions)
}

/// Missing feature values count as zero for the baseline
fn zero_fill(mut x: Array2<f64>) -> Array2<f64> {
    x.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
    x
}
