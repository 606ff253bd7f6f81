//! Time series feature engineering
//!
//! Calendar, cyclic-hour and autoregressive lag features derived from the
//! ordered record sequence. Nothing here looks at positions after the row
//! being built.

use crate::config::{validate_lags, DEFAULT_LAGS};
use crate::data::Record;
use crate::error::{ForecastError, Result};
use chrono::NaiveDateTime;
use ndarray::{Array1, Array2};
use std::f64::consts::PI;

/// Non-lag feature columns, in model order
pub const BASE_FEATURE_COLUMNS: [&str; 15] = [
    // calendar
    "workingday",
    "holiday",
    "is_weekend",
    "weekday",
    "month",
    "year",
    // time
    "hour",
    "hour_sin",
    "hour_cos",
    // weather
    "temp",
    "atemp",
    "hum",
    "windspeed",
    // categorical states
    "weathersit",
    "season",
];

/// Column name of the lag-`k` count feature
pub fn lag_column(lag: usize) -> String {
    format!("cnt_lag_{}", lag)
}

/// Derived per-record view
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub timestamp: NaiveDateTime,
    pub working_day: u8,
    pub holiday: u8,
    pub is_weekend: u8,
    pub weekday: u8,
    pub month: u8,
    pub year: i32,
    pub hour: u8,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub temperature: f64,
    pub feels_like_temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub weather_situation: u8,
    pub season: u8,
    /// One entry per configured lag; `None` where the lag reaches before the series start
    pub count_lags: Vec<Option<u32>>,
    /// Target
    pub count: u32,
}

impl FeatureRow {
    /// Whether every lag is defined
    pub fn has_complete_lags(&self) -> bool {
        self.count_lags.iter().all(Option::is_some)
    }

    /// Values in column order; undefined lags become NaN
    pub fn to_vec(&self) -> Vec<f64> {
        let mut values = vec![
            self.working_day as f64,
            self.holiday as f64,
            self.is_weekend as f64,
            self.weekday as f64,
            self.month as f64,
            self.year as f64,
            self.hour as f64,
            self.hour_sin,
            self.hour_cos,
            self.temperature,
            self.feels_like_temperature,
            self.humidity,
            self.wind_speed,
            self.weather_situation as f64,
            self.season as f64,
        ];
        values.extend(
            self.count_lags
                .iter()
                .map(|lag| lag.map_or(f64::NAN, |c| c as f64)),
        );
        values
    }
}

/// Feature generator over an ordered record sequence
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    lags: Vec<usize>,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self {
            lags: DEFAULT_LAGS.to_vec(),
        }
    }
}

impl FeatureBuilder {
    /// Create a builder for the given lag set (kept in the given order)
    pub fn new(lags: Vec<usize>) -> Result<Self> {
        validate_lags(&lags)?;
        Ok(Self { lags })
    }

    pub fn lags(&self) -> &[usize] {
        &self.lags
    }

    /// Largest configured lag: the length of the series head without full history
    pub fn max_lag(&self) -> usize {
        self.lags.iter().copied().max().unwrap_or(0)
    }

    /// Names of the lag columns, in lag order
    pub fn lag_columns(&self) -> Vec<String> {
        self.lags.iter().map(|&l| lag_column(l)).collect()
    }

    /// Full ordered feature column list
    pub fn feature_columns(&self) -> Vec<String> {
        BASE_FEATURE_COLUMNS
            .iter()
            .map(|s| s.to_string())
            .chain(self.lag_columns())
            .collect()
    }

    /// Derive one feature row per record, positionally aligned
    pub fn rows(&self, records: &[Record]) -> Vec<FeatureRow> {
        records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let hour = record.hour as f64;
                let angle = 2.0 * PI * hour / 24.0;
                FeatureRow {
                    timestamp: record.timestamp,
                    working_day: record.working_day,
                    holiday: record.holiday,
                    is_weekend: u8::from(record.weekday == 0 || record.weekday == 6),
                    weekday: record.weekday,
                    month: record.month,
                    year: record.year,
                    hour: record.hour,
                    hour_sin: angle.sin(),
                    hour_cos: angle.cos(),
                    temperature: record.temperature,
                    feels_like_temperature: record.feels_like_temperature,
                    humidity: record.humidity,
                    wind_speed: record.wind_speed,
                    weather_situation: record.weather_situation,
                    season: record.season,
                    count_lags: self.lags.iter().map(|&lag| lagged_count(records, i, lag)).collect(),
                    count: record.count,
                }
            })
            .collect()
    }

    /// Build the full (unfiltered) feature matrix
    pub fn build(&self, records: &[Record]) -> FeatureMatrix {
        let rows = self.rows(records);
        let columns = self.feature_columns();
        let n_cols = columns.len();

        let mut values = Array2::zeros((rows.len(), n_cols));
        for (i, row) in rows.iter().enumerate() {
            for (j, v) in row.to_vec().into_iter().enumerate() {
                values[[i, j]] = v;
            }
        }

        FeatureMatrix {
            columns,
            values,
            targets: rows.iter().map(|r| r.count as f64).collect(),
            timestamps: rows.iter().map(|r| r.timestamp).collect(),
        }
    }
}

/// Count `lag` positions before `i`, if the series reaches that far back
fn lagged_count(records: &[Record], i: usize, lag: usize) -> Option<u32> {
    i.checked_sub(lag).map(|j| records[j].count)
}

/// Named feature columns paired positionally with targets and timestamps
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Array2<f64>,
    targets: Array1<f64>,
    timestamps: Vec<NaiveDateTime>,
}

impl FeatureMatrix {
    /// Assemble a matrix; all three parts must have the same length
    pub fn new(
        columns: Vec<String>,
        values: Array2<f64>,
        targets: Array1<f64>,
        timestamps: Vec<NaiveDateTime>,
    ) -> Result<Self> {
        if values.ncols() != columns.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} columns", columns.len()),
                actual: format!("{} columns", values.ncols()),
            });
        }
        if values.nrows() != targets.len() || values.nrows() != timestamps.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} rows in targets and timestamps", values.nrows()),
                actual: format!(
                    "{} targets, {} timestamps",
                    targets.len(),
                    timestamps.len()
                ),
            });
        }
        Ok(Self {
            columns,
            values,
            targets,
            timestamps,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn targets(&self) -> &Array1<f64> {
        &self.targets
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Positions of `requested` columns, in requested order.
    ///
    /// The requested set must equal this matrix's column set exactly; any
    /// missing or extra column is a schema mismatch.
    pub fn column_positions(&self, requested: &[String]) -> Result<Vec<usize>> {
        let mismatch = || ForecastError::FeatureSchemaMismatch {
            expected: requested.to_vec(),
            actual: self.columns.clone(),
        };

        if requested.len() != self.columns.len() {
            return Err(mismatch());
        }
        let mut positions = Vec::with_capacity(requested.len());
        for name in requested {
            let idx = self.column_index(name).ok_or_else(mismatch)?;
            if positions.contains(&idx) {
                return Err(mismatch());
            }
            positions.push(idx);
        }
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::hourly_records;

    #[test]
    fn test_cyclic_hour_on_unit_circle() {
        let rows = FeatureBuilder::default().rows(&hourly_records(72));
        for row in &rows {
            let norm = row.hour_sin.powi(2) + row.hour_cos.powi(2);
            assert!((norm - 1.0).abs() < 1e-12, "hour {} norm {}", row.hour, norm);
        }
        assert_eq!(rows[0].hour_sin, 0.0);
        assert_eq!(rows[0].hour_cos, 1.0);
        assert!((rows[6].hour_sin - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lag_alignment() {
        let records = hourly_records(60);
        let builder = FeatureBuilder::default();
        let rows = builder.rows(&records);
        for (pos, &k) in builder.lags().iter().enumerate() {
            for i in 0..rows.len() {
                if i < k {
                    assert_eq!(rows[i].count_lags[pos], None);
                } else {
                    assert_eq!(rows[i].count_lags[pos], Some(records[i - k].count));
                }
            }
        }
    }

    #[test]
    fn test_lags_are_positional_across_a_gap() {
        use crate::data::count_gaps;
        use crate::timeseries::WindowFilter;
        use chrono::{Duration, Timelike};

        // six missing hours after position 40
        let mut records = hourly_records(80);
        for r in records.iter_mut().skip(41) {
            r.timestamp += Duration::hours(6);
            r.hour = r.timestamp.hour() as u8;
        }
        assert_eq!(count_gaps(&records), 1);

        let builder = FeatureBuilder::default();
        let rows = builder.rows(&records);
        for (pos, &k) in builder.lags().iter().enumerate() {
            for i in 41..41 + k {
                assert_eq!(rows[i].count_lags[pos], Some(records[i - k].count));
                assert!(records[i].timestamp - records[i - k].timestamp > Duration::hours(k as i64));
            }
            for i in (41 + k)..rows.len() {
                assert_eq!(rows[i].count_lags[pos], Some(records[i - k].count));
            }
        }

        let matrix = builder.build(&records);
        let view = WindowFilter::new(builder.lag_columns()).apply(&matrix).unwrap();
        assert_eq!(matrix.n_rows() - view.len(), builder.max_lag());
        assert_eq!(view.rows()[0], builder.max_lag());
    }

    #[test]
    fn test_is_weekend() {
        let mut records = hourly_records(7 * 24);
        for (day, chunk) in records.chunks_mut(24).enumerate() {
            for r in chunk {
                r.weekday = day as u8;
            }
        }
        let rows = FeatureBuilder::default().rows(&records);
        for row in rows {
            let expected = u8::from(row.weekday == 0 || row.weekday == 6);
            assert_eq!(row.is_weekend, expected);
        }
    }

    #[test]
    fn test_no_look_ahead() {
        let records = hourly_records(40);
        let builder = FeatureBuilder::default();
        let full = builder.build(&records);
        let prefix = builder.build(&records[..30]);
        for i in 0..30 {
            for j in 0..full.columns().len() {
                let a = full.values()[[i, j]];
                let b = prefix.values()[[i, j]];
                assert!(a.to_bits() == b.to_bits(), "row {} col {} changed", i, j);
            }
        }
    }

    #[test]
    fn test_matrix_columns_and_alignment() {
        let records = hourly_records(30);
        let builder = FeatureBuilder::new(vec![24, 1]).unwrap();
        let matrix = builder.build(&records);
        let cols = matrix.columns();
        assert_eq!(cols.len(), 17);
        assert_eq!(cols[15], "cnt_lag_24");
        assert_eq!(cols[16], "cnt_lag_1");
        assert_eq!(matrix.n_rows(), 30);
        assert_eq!(matrix.targets()[12], 12.0);
        assert_eq!(matrix.timestamps()[12], records[12].timestamp);
        assert!(matrix.values()[[0, 16]].is_nan());
        assert_eq!(matrix.values()[[25, 15]], 1.0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let records = hourly_records(50);
        let a = FeatureBuilder::default().build(&records);
        let b = FeatureBuilder::default().build(&records);
        let bits = |m: &FeatureMatrix| m.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_column_positions() {
        let matrix = FeatureMatrix::new(
            vec!["a".into(), "b".into()],
            Array2::zeros((1, 2)),
            Array1::zeros(1),
            vec![hourly_records(1)[0].timestamp],
        )
        .unwrap();
        assert_eq!(matrix.column_positions(&["b".into(), "a".into()]).unwrap(), vec![1, 0]);
        assert!(matrix.column_positions(&["a".into(), "c".into()]).is_err());
        assert!(matrix.column_positions(&["a".into()]).is_err());
        assert!(matrix.column_positions(&["a".into(), "a".into()]).is_err());
    }

    #[test]
    fn test_misaligned_matrix_rejected() {
        let result = FeatureMatrix::new(
            vec!["a".into()],
            Array2::zeros((2, 1)),
            Array1::zeros(1),
            Vec::new(),
        );
        assert!(result.is_err());
    }
}
