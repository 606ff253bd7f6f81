//! Point predictions for every valid hour of one calendar day

use crate::data::Record;
use crate::error::{ForecastError, Result};
use crate::export::TrainedModelBundle;
use crate::timeseries::{FeatureBuilder, WindowFilter};
use crate::training::Regressor;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rebuilds lag context from the full history and predicts one date
#[derive(Debug, Clone)]
pub struct DailyPredictor {
    bundle: TrainedModelBundle,
    builder: FeatureBuilder,
}

impl DailyPredictor {
    /// Predictor using the lag set recorded in the bundle
    pub fn new(bundle: TrainedModelBundle) -> Result<Self> {
        let builder = FeatureBuilder::new(bundle.lags.clone())?;
        Ok(Self { bundle, builder })
    }

    /// Override the feature builder (e.g. a different lag set)
    pub fn with_builder(mut self, builder: FeatureBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn bundle(&self) -> &TrainedModelBundle {
        &self.bundle
    }

    /// Predict every post-filter row of `records` whose date is `date`
    pub fn predict_date(&self, records: &[Record], date: NaiveDate) -> Result<DailyForecast> {
        let matrix = self.builder.build(records);
        let positions = matrix.column_positions(&self.bundle.feature_columns)?;

        let window = WindowFilter::new(self.builder.lag_columns()).apply(&matrix)?;
        let timestamps = matrix.timestamps();
        let day = window.filter(|row| timestamps[row].date() == date);
        if day.is_empty() {
            return Err(ForecastError::NoDataForDate { date });
        }
        debug!(%date, rows = day.len(), "selected rows for date");

        let x = day.features_for(&positions);
        let predictions = self.bundle.model.predict(&x)?;

        let rows: Vec<(NaiveDateTime, f64)> = day
            .timestamps()
            .into_iter()
            .zip(predictions.iter().copied())
            .collect();
        info!(%date, hours = rows.len(), model = self.bundle.model_name(), "daily forecast ready");
        Ok(DailyForecast { date, rows })
    }
}

/// Ordered `(timestamp, predicted count)` pairs for one date
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    date: NaiveDate,
    rows: Vec<(NaiveDateTime, f64)>,
}

impl DailyForecast {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn rows(&self) -> &[(NaiveDateTime, f64)] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `datetime,pred_cnt` frame
    pub fn to_frame(&self) -> Result<DataFrame> {
        let datetimes: Vec<String> = self
            .rows
            .iter()
            .map(|(ts, _)| ts.format(TIMESTAMP_FORMAT).to_string())
            .collect();
        let predictions: Vec<f64> = self.rows.iter().map(|(_, p)| *p).collect();
        let df = DataFrame::new(vec![
            Series::new("datetime".into(), datetimes),
            Series::new("pred_cnt".into(), predictions),
        ])?;
        Ok(df)
    }

    /// Write as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut df = self.to_frame()?;
        CsvWriter::new(writer).include_header(true).finish(&mut df)?;
        Ok(())
    }

    /// Write to `path` (parent directories created), or to stdout when `None`
    pub fn write_to(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).map_err(|e| ForecastError::write(parent, e))?;
                }
                let file = File::create(path).map_err(|e| ForecastError::write(path, e))?;
                let mut writer = BufWriter::new(file);
                self.write_csv(&mut writer)?;
                writer.flush().map_err(|e| ForecastError::write(path, e))?;
                info!(path = %path.display(), rows = self.len(), "predictions written");
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                self.write_csv(&mut handle)?;
            }
        }
        Ok(())
    }
}
