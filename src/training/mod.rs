//! Model training module
//!
//! Provides the fit/predict capability consumed by evaluation and prediction:
//! - Ordinary least squares (the comparison baseline)
//! - Histogram gradient boosting (the primary regressor)
//! - Holdout evaluation of one against the other

mod binning;
mod evaluator;
mod models;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;

pub use binning::BinMapper;
pub use decision_tree::{RegressionTree, TreeNode, TreeParams};
pub use evaluator::{BaselineProtocol, Evaluation, Evaluator};
pub use gradient_boosting::{EarlyStopping, GradientBoostingConfig, GradientBoostingRegressor};
pub use linear_models::LinearRegression;
pub use models::{mean_absolute_error, Regressor, TrainedModel};
