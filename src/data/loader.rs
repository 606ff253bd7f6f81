//! Time series loader: CSV / data frame → ordered hourly records

use super::record::*;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Loads hourly rows and orders them by timestamp
#[derive(Debug, Clone)]
pub struct TimeSeriesLoader {
    /// Rows scanned for CSV schema inference
    infer_schema_length: Option<usize>,
}

impl Default for TimeSeriesLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeriesLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(1000),
        }
    }

    /// Set the number of rows scanned for schema inference (`None` scans all)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<Vec<Record>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ForecastError::DataError(format!(
                "input file {} does not exist",
                path.display()
            )));
        }

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_schema_overwrite(Some(Arc::new(required_schema())))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()
            .map_err(|e| ForecastError::MalformedInput(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "csv read");
        self.load_frame(&df)
    }

    /// Convert an in-memory frame into records sorted by timestamp.
    ///
    /// The sort is stable: rows sharing a timestamp keep their input order.
    pub fn load_frame(&self, df: &DataFrame) -> Result<Vec<Record>> {
        for name in REQUIRED_COLUMNS {
            if df.column(name).is_err() {
                return Err(ForecastError::MalformedInput(format!(
                    "missing required column '{}'",
                    name
                )));
            }
        }

        let dates = date_column(df, COL_DATE)?;
        let hours = integer_column(df, COL_HOUR, 0..=23)?;
        let weekdays = integer_column(df, COL_WEEKDAY, 0..=6)?;
        let months = integer_column(df, COL_MONTH, 1..=12)?;
        let years = integer_column(df, COL_YEAR, 0..=9999)?;
        let working_days = integer_column(df, COL_WORKING_DAY, 0..=1)?;
        let holidays = integer_column(df, COL_HOLIDAY, 0..=1)?;
        let weather = integer_column(df, COL_WEATHER, 0..=255)?;
        let seasons = integer_column(df, COL_SEASON, 0..=255)?;
        let temps = numeric_column(df, COL_TEMP)?;
        let feels_like = numeric_column(df, COL_FEELS_LIKE)?;
        let humidity = numeric_column(df, COL_HUMIDITY)?;
        let wind = numeric_column(df, COL_WIND_SPEED)?;
        let counts = integer_column(df, COL_COUNT, 0..=u32::MAX as i64)?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            records.push(Record {
                timestamp: combine(dates[i], hours[i], i)?,
                weekday: weekdays[i] as u8,
                month: months[i] as u8,
                year: years[i] as i32,
                hour: hours[i] as u8,
                working_day: working_days[i] as u8,
                holiday: holidays[i] as u8,
                weather_situation: weather[i] as u8,
                season: seasons[i] as u8,
                temperature: temps[i],
                feels_like_temperature: feels_like[i],
                humidity: humidity[i],
                wind_speed: wind[i],
                count: counts[i] as u32,
            });
        }

        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

/// Pinned dtypes for the required columns; every numeric one reads as f64
fn required_schema() -> Schema {
    Schema::from_iter(REQUIRED_COLUMNS.iter().map(|&name| {
        let dtype = if name == COL_DATE {
            DataType::String
        } else {
            DataType::Float64
        };
        Field::new(name.into(), dtype)
    }))
}

/// Date plus hour offset
fn combine(date: NaiveDate, hour: i64, row: usize) -> Result<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight + Duration::hours(hour))
        .ok_or_else(|| ForecastError::MalformedInput(format!("row {}: invalid timestamp", row)))
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

fn date_column(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let series = df.column(name)?.cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let raw = value.ok_or_else(|| {
                ForecastError::MalformedInput(format!("row {}: missing value in '{}'", row, name))
            })?;
            parse_date(raw).ok_or_else(|| {
                ForecastError::MalformedInput(format!(
                    "row {}: cannot parse date '{}' in '{}'",
                    row, raw, name
                ))
            })
        })
        .collect()
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(ForecastError::MalformedInput(format!(
                "row {}: missing or non-numeric value in '{}'",
                row, name
            ))),
        })
        .collect()
}

fn integer_column(df: &DataFrame, name: &str, range: RangeInclusive<i64>) -> Result<Vec<i64>> {
    numeric_column(df, name)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            if v.fract() != 0.0 {
                return Err(ForecastError::MalformedInput(format!(
                    "row {}: '{}' must be an integer, got {}",
                    row, name, v
                )));
            }
            let v = v as i64;
            if !range.contains(&v) {
                return Err(ForecastError::MalformedInput(format!(
                    "row {}: '{}' = {} is outside {:?}",
                    row, name, v, range
                )));
            }
            Ok(v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn frame(dates: &[&str], hours: &[i64], counts: &[i64]) -> DataFrame {
        let n = dates.len();
        df!(
            "instant" => &(1..=n as i64).collect::<Vec<_>>(),
            "dteday" => dates,
            "season" => &vec![1i64; n],
            "yr" => &vec![0i64; n],
            "mnth" => &vec![1i64; n],
            "hr" => hours,
            "holiday" => &vec![0i64; n],
            "weekday" => &vec![6i64; n],
            "workingday" => &vec![0i64; n],
            "weathersit" => &vec![1i64; n],
            "temp" => &vec![0.24; n],
            "atemp" => &vec![0.2879; n],
            "hum" => &vec![0.81; n],
            "windspeed" => &vec![0.0; n],
            "cnt" => counts
        )
        .unwrap()
    }

    #[test]
    fn test_sorted_by_timestamp() {
        let df = frame(
            &["2011-01-02", "2011-01-01", "2011-01-01"],
            &[0, 5, 1],
            &[30, 20, 10],
        );
        let records = TimeSeriesLoader::new().load_frame(&df).unwrap();
        let counts: Vec<u32> = records.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![10, 20, 30]);
        assert_eq!(records[1].timestamp.hour(), 5);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let df = frame(&["2011-01-01", "2011-01-01"], &[3, 3], &[7, 8]);
        let records = TimeSeriesLoader::new().load_frame(&df).unwrap();
        assert_eq!(records[0].count, 7);
        assert_eq!(records[1].count, 8);
    }

    #[test]
    fn test_datetime_strings_accepted() {
        let df = frame(&["2011-01-01 00:00:00"], &[4], &[1]);
        let records = TimeSeriesLoader::new().load_frame(&df).unwrap();
        assert_eq!(records[0].timestamp.hour(), 4);
    }

    #[test]
    fn test_missing_column_is_malformed() {
        let df = frame(&["2011-01-01"], &[0], &[1]).drop("cnt").unwrap();
        let err = TimeSeriesLoader::new().load_frame(&df).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedInput(ref m) if m.contains("cnt")));
    }

    #[test]
    fn test_bad_date_is_malformed() {
        let df = frame(&["01/02/2011"], &[0], &[1]);
        let err = TimeSeriesLoader::new().load_frame(&df).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedInput(_)));
    }

    #[test]
    fn test_hour_out_of_range_is_malformed() {
        let df = frame(&["2011-01-01"], &[24], &[1]);
        assert!(TimeSeriesLoader::new().load_frame(&df).is_err());
    }

    #[test]
    fn test_negative_count_is_malformed() {
        let df = frame(&["2011-01-01"], &[0], &[-1]);
        assert!(TimeSeriesLoader::new().load_frame(&df).is_err());
    }

    #[test]
    fn test_fractional_value_after_inference_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hour.csv");
        let mut csv = String::from(
            "dteday,season,yr,mnth,hr,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,cnt\n",
        );
        for i in 0..1300 {
            let wind = if i < 1200 { "0" } else { "0.1343" };
            csv.push_str(&format!(
                "2011-01-{:02},1,0,1,{},0,6,0,1,0.24,0.2879,0.81,{},{}\n",
                1 + i / 24 % 28,
                i % 24,
                wind,
                i
            ));
        }
        std::fs::write(&path, csv).unwrap();

        let records = TimeSeriesLoader::new().load_csv(&path).unwrap();
        assert_eq!(records.len(), 1300);
        let max_wind = records.iter().map(|r| r.wind_speed).fold(0.0, f64::max);
        assert!((max_wind - 0.1343).abs() < 1e-12);
    }

    #[test]
    fn test_fractional_count_in_csv_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hour.csv");
        std::fs::write(
            &path,
            "dteday,season,yr,mnth,hr,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,cnt\n\
             2011-01-01,1,0,1,0,0,6,0,1,0.24,0.2879,0.81,0,16.5\n",
        )
        .unwrap();
        let err = TimeSeriesLoader::new().load_csv(&path).unwrap_err();
        assert!(matches!(err, ForecastError::MalformedInput(ref m) if m.contains("cnt")));
    }

    #[test]
    fn test_missing_file() {
        let err = TimeSeriesLoader::new()
            .load_csv("/definitely/not/here/hour.csv")
            .unwrap_err();
        assert!(matches!(err, ForecastError::DataError(_)));
    }
}
