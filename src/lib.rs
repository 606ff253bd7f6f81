//! Bikeshare Forecast - hourly demand forecasting
//!
//! This crate turns an hourly rental log into a supervised learning problem
//! and evaluates it without leaking the future:
//! - Calendar, cyclic-hour and autoregressive lag features
//! - Valid-window filtering and chronological holdout splitting
//! - A linear baseline against a histogram gradient-boosted regressor
//! - Point predictions for any calendar day in the history
//!
//! # Modules
//!
//! - [`data`] - CSV ingestion into typed hourly records
//! - [`timeseries`] - Feature construction, window filtering, splitting
//! - [`training`] - Regressors and holdout evaluation
//! - [`export`] - Model bundle and metrics persistence
//! - [`inference`] - Daily prediction from a persisted bundle
//! - [`pipeline`] - The end-to-end training run
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

pub mod data;
pub mod timeseries;
pub mod training;
pub mod export;
pub mod inference;
pub mod pipeline;

pub mod cli;

pub use error::{ForecastError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{PipelineConfig, DEFAULT_LAGS};
    pub use crate::data::{Record, TimeSeriesLoader};
    pub use crate::error::{ForecastError, Result};
    pub use crate::export::{MetricsRecord, ReportWriter, TrainedModelBundle};
    pub use crate::inference::{DailyForecast, DailyPredictor};
    pub use crate::pipeline::{PipelineOutcome, TrainingPipeline};
    pub use crate::timeseries::{
        ChronologicalSplitter, FeatureBuilder, FeatureMatrix, SeriesView, Split, WindowFilter,
    };
    pub use crate::training::{
        BaselineProtocol, Evaluation, Evaluator, GradientBoostingConfig,
        GradientBoostingRegressor, LinearRegression, Regressor, TrainedModel,
    };
}
