//! Integration tests for the training pipeline: windowing, splitting, persistence

mod common;

use bikeshare_forecast::prelude::*;
use bikeshare_forecast::export::{METRICS_FILE, MODEL_FILE};
use common::{hourly_csv, linear_counts, seasonal_counts, write_data};
use std::fs;
use tempfile::tempdir;

fn config_for(dir: &std::path::Path, csv: &str) -> PipelineConfig {
    let data_dir = write_data(dir, csv);
    PipelineConfig::new()
        .with_data_dir(data_dir)
        .with_artifacts_dir(dir.join("artifacts"))
}

// ============================================================================
// Scenario: 50-hour rising series
// ============================================================================

#[test]
fn test_fifty_hour_scenario_counts() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), &hourly_csv(50, linear_counts));

    let outcome = TrainingPipeline::new(config).unwrap().run().unwrap();

    assert_eq!(outcome.n_records, 50);
    assert_eq!(outcome.metrics.n_train, 21);
    assert_eq!(outcome.metrics.n_valid, 5);
    assert_eq!(outcome.metrics.metric, "MAE");
    assert_eq!(outcome.metrics.seed, 42);
    assert!(outcome.metrics.mae.is_some());
    assert!(outcome.metrics.generated_at.ends_with('Z'));
}

#[test]
fn test_fifty_hour_scenario_split_by_hand() {
    let dir = tempdir().unwrap();
    let data_dir = write_data(dir.path(), &hourly_csv(50, linear_counts));
    let records = TimeSeriesLoader::new().load_csv(data_dir.join("hour.csv")).unwrap();

    let builder = FeatureBuilder::default();
    let matrix = builder.build(&records);
    let view = WindowFilter::new(builder.lag_columns()).apply(&matrix).unwrap();
    assert_eq!(matrix.n_rows() - view.len(), 24);
    assert_eq!(view.len(), 26);

    let split = ChronologicalSplitter::new(0.2).unwrap().split(&view);
    assert_eq!(split.holdout.len(), 5);
    assert_eq!(split.train.len(), 21);
    assert_eq!(split.holdout.targets().to_vec(), vec![45.0, 46.0, 47.0, 48.0, 49.0]);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_artifacts_written() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), &hourly_csv(24 * 21, seasonal_counts));

    let outcome = TrainingPipeline::new(config).unwrap().run().unwrap();
    let artifacts = dir.path().join("artifacts");
    assert_eq!(outcome.model_path, artifacts.join(MODEL_FILE));
    assert_eq!(outcome.metrics_path, artifacts.join(METRICS_FILE));

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&outcome.metrics_path).unwrap()).unwrap();
    for key in ["metric", "mae", "baselines", "n_train", "n_valid", "seed", "generated_at"] {
        assert!(metrics.get(key).is_some(), "missing {}", key);
    }
    assert!(metrics["baselines"].get("linear_regression_mae").is_some());

    let bundle = TrainedModelBundle::load(&outcome.model_path).unwrap();
    assert_eq!(bundle.feature_columns, outcome.feature_columns);
    assert_eq!(bundle.lags, vec![1, 2, 24]);
    assert_eq!(bundle.model_name(), "gradient_boosting");

    let summaries = outcome.summaries.unwrap();
    assert_eq!(summaries.len(), 3);
    assert!(summaries.iter().all(|p| p.exists()));
}

#[test]
fn test_model_beats_mean_on_seasonal_series() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), &hourly_csv(24 * 21, seasonal_counts));
    let outcome = TrainingPipeline::new(config).unwrap().run().unwrap();

    // predicting the overall mean would be off by roughly 50 on average
    let mae = outcome.metrics.mae.unwrap();
    assert!(mae < 25.0, "holdout MAE {} too large", mae);
}

#[test]
fn test_runs_are_idempotent() {
    let csv = hourly_csv(24 * 14, seasonal_counts);
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();

    let a = TrainingPipeline::new(config_for(first.path(), &csv)).unwrap().run().unwrap();
    let b = TrainingPipeline::new(config_for(second.path(), &csv)).unwrap().run().unwrap();

    assert_eq!(a.metrics.mae.map(f64::to_bits), b.metrics.mae.map(f64::to_bits));
    assert_eq!(
        a.metrics.baseline_mae().map(f64::to_bits),
        b.metrics.baseline_mae().map(f64::to_bits)
    );
    assert_eq!(a.feature_columns, b.feature_columns);
    assert_eq!(
        fs::read_to_string(&a.model_path).unwrap(),
        fs::read_to_string(&b.model_path).unwrap()
    );
}

#[test]
fn test_custom_lags_change_window() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), &hourly_csv(50, linear_counts)).with_lags(vec![1, 3]);
    let outcome = TrainingPipeline::new(config).unwrap().run().unwrap();

    // 47 valid rows: holdout floor(9.4) = 9
    assert_eq!(outcome.metrics.n_valid, 9);
    assert_eq!(outcome.metrics.n_train, 38);
    assert!(outcome.feature_columns.ends_with(&["cnt_lag_1".to_string(), "cnt_lag_3".to_string()]));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_input_fails_without_bundle() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig::new()
        .with_data_dir(dir.path().join("nowhere"))
        .with_artifacts_dir(dir.path().join("artifacts"));

    assert!(TrainingPipeline::new(config).unwrap().run().is_err());
    assert!(!dir.path().join("artifacts").join(MODEL_FILE).exists());
}

#[test]
fn test_missing_column_is_malformed_input() {
    let dir = tempdir().unwrap();
    let csv = hourly_csv(50, linear_counts).replace(",cnt\n", ",total\n");
    let config = config_for(dir.path(), &csv);

    let err = TrainingPipeline::new(config).unwrap().run().unwrap_err();
    assert!(matches!(err, ForecastError::MalformedInput(_)), "got {:?}", err);
    assert!(!dir.path().join("artifacts").join(MODEL_FILE).exists());
}

#[test]
fn test_metrics_failure_leaves_no_bundle() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), &hourly_csv(24 * 7, seasonal_counts)).with_summaries(false);
    let blocked = dir.path().join("artifacts").join(METRICS_FILE);
    fs::create_dir_all(&blocked).unwrap();
    fs::write(blocked.join("keep"), b"x").unwrap();

    let err = TrainingPipeline::new(config).unwrap().run().unwrap_err();
    assert!(matches!(err, ForecastError::WriteError { .. }), "got {:?}", err);
    assert!(!dir.path().join("artifacts").join(MODEL_FILE).exists());
}

#[test]
fn test_history_shorter_than_window() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), &hourly_csv(20, linear_counts));
    assert!(TrainingPipeline::new(config).unwrap().run().is_err());
}

#[test]
fn test_invalid_config_rejected_up_front() {
    let config = PipelineConfig::new().with_holdout_fraction(0.0);
    assert!(TrainingPipeline::new(config).is_err());
}
