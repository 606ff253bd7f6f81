//! Inference module
//!
//! Serves point predictions for a calendar day from a persisted model bundle
//! and the full demand history that supplies the lag context.

mod daily;

pub use daily::{DailyForecast, DailyPredictor};
