//! Bikeshare forecast CLI module
//!
//! Command-line interface for training and daily prediction.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{parse_lags, PipelineConfig};
use crate::data::TimeSeriesLoader;
use crate::export::{TrainedModelBundle, LINEAR_BASELINE_KEY};
use crate::inference::DailyPredictor;
use crate::pipeline::TrainingPipeline;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<24} {}", muted(key), val.white().bold());
}

fn fmt_metric(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.4}", v),
        _ => "undefined".to_string(),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "bikeshare")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hourly bike-rental demand forecasting")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train on the hourly history and write the model bundle and metrics
    Train {
        /// JSON configuration file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding hour.csv
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Directory receiving model.json, metrics.json and summaries
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,

        /// Seed for the model-fitting collaborator
        #[arg(long)]
        seed: Option<u64>,

        /// Trailing fraction of valid rows held out for evaluation
        #[arg(long)]
        holdout_fraction: Option<f64>,

        /// Comma-separated lag set, e.g. 1,2,24
        #[arg(long)]
        lags: Option<String>,
    },

    /// Predict every valid hour of one date
    Predict {
        /// Trained model bundle
        #[arg(short, long)]
        model_path: PathBuf,

        /// Target date (YYYY-MM-DD)
        #[arg(short, long)]
        date: NaiveDate,

        /// Directory holding hour.csv
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Output CSV file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Merge the optional config file with command-line overrides
pub fn build_train_config(
    config_path: Option<&Path>,
    data_dir: Option<PathBuf>,
    artifacts_dir: Option<PathBuf>,
    seed: Option<u64>,
    holdout_fraction: Option<f64>,
    lags: Option<&str>,
) -> anyhow::Result<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(dir) = artifacts_dir {
        config = config.with_artifacts_dir(dir);
    }
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }
    if let Some(fraction) = holdout_fraction {
        config = config.with_holdout_fraction(fraction);
    }
    if let Some(raw) = lags {
        config = config.with_lags(parse_lags(raw)?);
    }
    config.validate()?;
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(config: PipelineConfig) -> anyhow::Result<()> {
    section("Train");

    step_run("Running pipeline");
    let start = Instant::now();
    let pipeline = TrainingPipeline::new(config)?;
    let outcome = pipeline.run()?;
    step_done(&format!("{:?}", start.elapsed()));

    step_ok(&format!(
        "{} records, {} features",
        outcome.n_records,
        outcome.feature_columns.len()
    ));
    if outcome.n_gaps > 0 {
        println!(
            "  {} {}",
            "!".yellow(),
            format!("{} gaps in the hourly series; lags are positional", outcome.n_gaps).yellow()
        );
    }
    match &outcome.summaries {
        Ok(paths) if !paths.is_empty() => step_ok(&format!("{} summaries written", paths.len())),
        Ok(_) => {}
        Err(reason) => println!("  {} {}", "!".yellow(), format!("summaries skipped: {}", reason).yellow()),
    }
    step_ok(&format!("model  → {}", outcome.model_path.display()));
    step_ok(&format!("metrics → {}", outcome.metrics_path.display()));

    section("Holdout MAE");
    kv("model", &fmt_metric(outcome.metrics.mae));
    kv(LINEAR_BASELINE_KEY, &fmt_metric(outcome.metrics.baseline_mae()));
    kv("n_train", &outcome.metrics.n_train.to_string());
    kv("n_valid", &outcome.metrics.n_valid.to_string());
    kv("seed", &outcome.metrics.seed.to_string());
    println!();
    println!("{}", serde_json::to_string_pretty(&outcome.metrics)?);
    println!();

    Ok(())
}

pub fn cmd_predict(
    model_path: &Path,
    date: NaiveDate,
    data_dir: &Path,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    // CSV goes to stdout when no file is given; keep decorations out of it
    let decorate = out.is_some();
    if decorate {
        section("Predict");
        step_run("Loading model bundle");
    }
    let bundle = TrainedModelBundle::load(model_path)?;
    if decorate {
        step_done(bundle.model_name());
        step_run("Loading history");
    }

    let data_path = data_dir.join(PipelineConfig::default().data_file);
    let records = TimeSeriesLoader::new().load_csv(&data_path)?;
    if decorate {
        step_done(&format!("{} records", records.len()));
    }

    let forecast = DailyPredictor::new(bundle)?.predict_date(&records, date)?;
    forecast.write_to(out)?;

    if let Some(path) = out {
        step_ok(&format!("{} hourly predictions → {}", forecast.len(), path.display()));
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_train_flags() {
        let cli = Cli::try_parse_from([
            "bikeshare",
            "train",
            "--seed",
            "7",
            "--holdout-fraction",
            "0.25",
            "--lags",
            "1,24",
        ])
        .unwrap();
        match cli.command {
            Commands::Train { seed, holdout_fraction, lags, .. } => {
                assert_eq!(seed, Some(7));
                assert_eq!(holdout_fraction, Some(0.25));
                assert_eq!(lags.as_deref(), Some("1,24"));
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_cli_parses_predict_date() {
        let cli = Cli::try_parse_from([
            "bikeshare",
            "predict",
            "--model-path",
            "artifacts/model.json",
            "--date",
            "2012-12-31",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict { date, data_dir, out, .. } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2012, 12, 31).unwrap());
                assert_eq!(data_dir, PathBuf::from("data"));
                assert!(out.is_none());
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = build_train_config(
            None,
            Some("input".into()),
            None,
            Some(9),
            Some(0.3),
            Some("2,1"),
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("input"));
        assert_eq!(config.seed, 9);
        assert_eq!(config.holdout_fraction, 0.3);
        assert_eq!(config.lags, vec![2, 1]);
    }

    #[test]
    fn test_invalid_override_rejected() {
        assert!(build_train_config(None, None, None, None, Some(1.5), None).is_err());
        assert!(build_train_config(None, None, None, None, None, Some("1,1")).is_err());
    }
}
