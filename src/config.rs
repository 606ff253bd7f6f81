//! Pipeline configuration
//!
//! Every component receives its settings from a [`PipelineConfig`] passed in
//! explicitly; nothing is read from process-wide state.

use crate::error::{ForecastError, Result};
use crate::training::{BaselineProtocol, GradientBoostingConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default lag set: previous hour, two hours back, same hour yesterday
pub const DEFAULT_LAGS: [usize; 3] = [1, 2, 24];

/// Configuration for a training run (and the defaults used by prediction)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the hourly input file
    pub data_dir: PathBuf,

    /// Input file name inside `data_dir`
    pub data_file: String,

    /// Directory receiving the model bundle, metrics and summaries
    pub artifacts_dir: PathBuf,

    /// Trailing fraction of the valid window used as holdout, in (0, 1)
    pub holdout_fraction: f64,

    /// Lag offsets (in records) for the autoregressive features
    pub lags: Vec<usize>,

    /// Seed for the model-fitting collaborator
    pub seed: u64,

    /// Which rows the linear baseline is fitted on
    pub baseline_protocol: BaselineProtocol,

    /// Primary regressor hyper-parameters
    pub model: GradientBoostingConfig,

    /// Write the exploratory hourly summaries (best effort)
    pub write_summaries: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            data_file: "hour.csv".to_string(),
            artifacts_dir: PathBuf::from("artifacts"),
            holdout_fraction: 0.2,
            lags: DEFAULT_LAGS.to_vec(),
            seed: 42,
            baseline_protocol: BaselineProtocol::default(),
            model: GradientBoostingConfig::default(),
            write_summaries: true,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; absent fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_data_file(mut self, name: impl Into<String>) -> Self {
        self.data_file = name.into();
        self
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = dir.into();
        self
    }

    pub fn with_holdout_fraction(mut self, fraction: f64) -> Self {
        self.holdout_fraction = fraction;
        self
    }

    pub fn with_lags(mut self, lags: Vec<usize>) -> Self {
        self.lags = lags;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_baseline_protocol(mut self, protocol: BaselineProtocol) -> Self {
        self.baseline_protocol = protocol;
        self
    }

    pub fn with_model(mut self, model: GradientBoostingConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_summaries(mut self, enabled: bool) -> Self {
        self.write_summaries = enabled;
        self
    }

    /// Path of the hourly input file
    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join(&self.data_file)
    }

    /// Path of the persisted model bundle
    pub fn model_path(&self) -> PathBuf {
        self.artifacts_dir.join("model.json")
    }

    /// Path of the persisted metrics record
    pub fn metrics_path(&self) -> PathBuf {
        self.artifacts_dir.join("metrics.json")
    }

    /// Directory for the exploratory summaries
    pub fn summaries_dir(&self) -> PathBuf {
        self.artifacts_dir.join("summaries")
    }

    /// Primary regressor config seeded from the run seed
    pub fn model_config(&self) -> GradientBoostingConfig {
        GradientBoostingConfig {
            random_state: Some(self.seed),
            ..self.model.clone()
        }
    }

    /// Check every setting before any work is done
    pub fn validate(&self) -> Result<()> {
        if !(self.holdout_fraction > 0.0 && self.holdout_fraction < 1.0) {
            return Err(ForecastError::InvalidParameter {
                name: "holdout_fraction".to_string(),
                value: self.holdout_fraction.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        validate_lags(&self.lags)?;
        self.model.validate()?;
        Ok(())
    }
}

/// Lags must be non-empty, positive and unique
pub fn validate_lags(lags: &[usize]) -> Result<()> {
    if lags.is_empty() {
        return Err(ForecastError::InvalidParameter {
            name: "lags".to_string(),
            value: "[]".to_string(),
            reason: "at least one lag is required".to_string(),
        });
    }
    let mut seen = HashSet::new();
    for &lag in lags {
        if lag == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "lags".to_string(),
                value: format!("{:?}", lags),
                reason: "lag 0 would leak the target".to_string(),
            });
        }
        if !seen.insert(lag) {
            return Err(ForecastError::InvalidParameter {
                name: "lags".to_string(),
                value: format!("{:?}", lags),
                reason: format!("lag {} listed twice", lag),
            });
        }
    }
    Ok(())
}

/// Parse a comma-separated lag list such as `1,2,24`
pub fn parse_lags(raw: &str) -> Result<Vec<usize>> {
    let lags = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>().map_err(|_| ForecastError::InvalidParameter {
                name: "lags".to_string(),
                value: raw.to_string(),
                reason: format!("'{}' is not a non-negative integer", s),
            })
        })
        .collect::<Result<Vec<usize>>>()?;
    validate_lags(&lags)?;
    Ok(lags)
}
