//! Holdout metrics record

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LINEAR_BASELINE_KEY: &str = "linear_regression_mae";

/// One run's metrics plus provenance; written once, never updated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Always "MAE"
    pub metric: String,
    /// Primary model holdout MAE
    pub mae: Option<f64>,
    pub baselines: BTreeMap<String, Option<f64>>,
    pub n_train: usize,
    pub n_valid: usize,
    pub seed: u64,
    /// ISO-8601 UTC
    pub generated_at: String,
}

impl MetricsRecord {
    pub fn new(
        model_mae: Option<f64>,
        baseline_mae: Option<f64>,
        n_train: usize,
        n_valid: usize,
        seed: u64,
    ) -> Self {
        Self::at(Utc::now(), model_mae, baseline_mae, n_train, n_valid, seed)
    }

    /// Record stamped with an explicit generation time
    pub fn at(
        generated_at: DateTime<Utc>,
        model_mae: Option<f64>,
        baseline_mae: Option<f64>,
        n_train: usize,
        n_valid: usize,
        seed: u64,
    ) -> Self {
        let mut baselines = BTreeMap::new();
        baselines.insert(LINEAR_BASELINE_KEY.to_string(), baseline_mae);
        Self {
            metric: "MAE".to_string(),
            mae: model_mae,
            baselines,
            n_train,
            n_valid,
            seed,
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    pub fn baseline_mae(&self) -> Option<f64> {
        self.baselines.get(LINEAR_BASELINE_KEY).copied().flatten()
    }
}
