//! Error types for the forecasting pipeline

use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Input rows are missing a required field or hold an unparsable value
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// No post-filter rows fall on the requested date
    #[error("No data for date {date}: the date is outside the history or inside the lag warm-up window")]
    NoDataForDate { date: NaiveDate },

    /// Persisted feature columns differ from what the current pipeline produces
    #[error("Feature schema mismatch: model expects {expected:?}, pipeline produces {actual:?}")]
    FeatureSchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for ForecastError {
    fn from(err: polars::error::PolarsError) -> Self {
        ForecastError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ForecastError {
    fn from(err: ndarray::ShapeError) -> Self {
        ForecastError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl ForecastError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ForecastError::WriteError {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ForecastError::MalformedInput("missing column 'cnt'".to_string());
        assert_eq!(err.to_string(), "Malformed input: missing column 'cnt'");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ForecastError = io_err.into();
        assert!(matches!(err, ForecastError::IoError(_)));
    }

    #[test]
    fn test_no_data_for_date_mentions_date() {
        let date = NaiveDate::from_ymd_opt(2011, 1, 1).unwrap();
        let err = ForecastError::NoDataForDate { date };
        assert!(err.to_string().contains("2011-01-01"));
    }

    #[test]
    fn test_schema_mismatch_lists_columns() {
        let err = ForecastError::FeatureSchemaMismatch {
            expected: vec!["a".into(), "b".into()],
            actual: vec!["a".into(), "c".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"b\""));
        assert!(msg.contains("\"c\""));
    }
}
