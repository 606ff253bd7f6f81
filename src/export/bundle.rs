//! Persisted model bundle: fitted parameters plus the feature schema they expect

use crate::config::validate_lags;
use crate::error::{ForecastError, Result};
use crate::training::{Regressor, TrainedModel};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::writer::write_json_atomic;

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Everything needed to predict later without retraining
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModelBundle {
    pub format_version: u32,
    pub model: TrainedModel,
    /// Feature columns, in the order the model was trained on
    pub feature_columns: Vec<String>,
    /// Lag set the features were built with
    pub lags: Vec<usize>,
}

impl TrainedModelBundle {
    pub fn new(model: impl Into<TrainedModel>, feature_columns: Vec<String>, lags: Vec<usize>) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            model: model.into(),
            feature_columns,
            lags,
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_json_atomic(path.as_ref(), self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ForecastError::DataError(format!("Failed to read model bundle {}: {}", path.display(), e))
        })?;
        let bundle: Self = serde_json::from_str(&text)?;
        bundle.check()?;
        debug!(
            path = %path.display(),
            model = bundle.model_name(),
            n_features = bundle.feature_columns.len(),
            "model bundle loaded"
        );
        Ok(bundle)
    }

    fn check(&self) -> Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(ForecastError::SerializationError(format!(
                "unsupported model bundle format version {} (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            )));
        }
        if self.feature_columns.is_empty() {
            return Err(ForecastError::SerializationError(
                "model bundle lists no feature columns".to_string(),
            ));
        }
        validate_lags(&self.lags)
    }
}
