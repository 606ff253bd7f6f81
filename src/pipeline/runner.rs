//! End-to-end training run: load, featurize, split, evaluate, persist

use super::summaries::{run_best_effort, write_summaries};
use crate::config::PipelineConfig;
use crate::data::{count_gaps, TimeSeriesLoader};
use crate::error::{ForecastError, Result};
use crate::export::{MetricsRecord, ReportWriter, TrainedModelBundle};
use crate::timeseries::{ChronologicalSplitter, FeatureBuilder, WindowFilter};
use crate::training::{Evaluator, GradientBoostingRegressor};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// What a completed run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub metrics: MetricsRecord,
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
    /// Summary files, or the reason they could not be written
    pub summaries: std::result::Result<Vec<PathBuf>, String>,
    pub n_records: usize,
    pub n_gaps: usize,
    pub feature_columns: Vec<String>,
}

/// Sequential training pipeline driven by one [`PipelineConfig`]
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: PipelineConfig,
    loader: TimeSeriesLoader,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            loader: TimeSeriesLoader::new(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<PipelineOutcome> {
        let config = &self.config;
        let started = Instant::now();

        fs::create_dir_all(&config.artifacts_dir)
            .map_err(|e| ForecastError::write(&config.artifacts_dir, e))?;

        let data_path = config.data_path();
        info!(path = %data_path.display(), "loading demand history");
        let records = self.loader.load_csv(&data_path)?;
        let n_gaps = count_gaps(&records);
        if n_gaps > 0 {
            warn!(
                gaps = n_gaps,
                "hourly series has gaps; lag features refer to previous rows, not previous hours"
            );
        }
        info!(records = records.len(), "history loaded");

        let summaries = if config.write_summaries {
            run_best_effort("summaries", || write_summaries(&records, &config.summaries_dir()))
        } else {
            Ok(Vec::new())
        };

        let builder = FeatureBuilder::new(config.lags.clone())?;
        let matrix = builder.build(&records);
        info!(rows = matrix.n_rows(), columns = matrix.columns().len(), "features built");

        let view = WindowFilter::new(builder.lag_columns()).apply(&matrix)?;
        info!(
            valid = view.len(),
            dropped = matrix.n_rows() - view.len(),
            "lag warm-up rows dropped"
        );

        let split = ChronologicalSplitter::new(config.holdout_fraction)?.split(&view);
        if split.train.is_empty() {
            return Err(ForecastError::DataError(format!(
                "no training rows: {} records leave {} rows after the {}-row lag window",
                records.len(),
                view.len(),
                builder.max_lag()
            )));
        }
        info!(
            train = split.train.len(),
            holdout = split.holdout.len(),
            split_index = split.split_index(),
            "chronological split"
        );

        let evaluation = Evaluator::new(config.baseline_protocol)
            .evaluate(GradientBoostingRegressor::new(config.model_config()), &split)?;
        info!(
            mae = ?evaluation.model_mae,
            baseline_mae = ?evaluation.baseline_mae,
            n_iter = evaluation.model.n_iter(),
            "evaluation finished"
        );

        let writer = ReportWriter::new(&config.artifacts_dir);
        let bundle = TrainedModelBundle::new(
            evaluation.model,
            matrix.columns().to_vec(),
            builder.lags().to_vec(),
        );
        let metrics = MetricsRecord::new(
            evaluation.model_mae,
            evaluation.baseline_mae,
            evaluation.n_train,
            evaluation.n_holdout,
            config.seed,
        );
        let (model_path, metrics_path) = writer.write_run(&bundle, &metrics)?;

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "training run complete");
        Ok(PipelineOutcome {
            metrics,
            model_path,
            metrics_path,
            summaries,
            n_records: records.len(),
            n_gaps,
            feature_columns: bundle.feature_columns,
        })
    }
}
