//! Exploratory per-hour and per-day summaries of the loaded history

use crate::data::Record;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const COUNT_BY_HOUR_FILE: &str = "count_by_hour.csv";
pub const AVG_COUNT_BY_HOUR_FILE: &str = "avg_cnt_by_hour.csv";
pub const DAILY_TOTALS_FILE: &str = "daily_totals.csv";

/// Run an optional side task; failure is logged and returned as a message
pub fn run_best_effort<T>(task: &str, f: impl FnOnce() -> Result<T>) -> std::result::Result<T, String> {
    f().map_err(|e| {
        warn!(task, error = %e, "optional step failed; continuing");
        e.to_string()
    })
}

/// Write the three summary tables into `dir`, returning their paths
pub fn write_summaries(records: &[Record], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| ForecastError::write(dir, e))?;

    let mut by_hour: BTreeMap<u8, (u32, u64)> = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records {
        let entry = by_hour.entry(record.hour).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += u64::from(record.count);
        *by_day.entry(record.date()).or_insert(0) += u64::from(record.count);
    }

    let hours: Vec<u32> = by_hour.keys().map(|&h| u32::from(h)).collect();
    let counts: Vec<u32> = by_hour.values().map(|(n, _)| *n).collect();
    let averages: Vec<f64> = by_hour
        .values()
        .map(|(n, total)| *total as f64 / f64::from(*n))
        .collect();
    let dates: Vec<String> = by_day.keys().map(|d| d.format("%Y-%m-%d").to_string()).collect();
    let totals: Vec<u64> = by_day.values().copied().collect();

    let mut count_by_hour = df!("hr" => &hours, "count" => &counts)?;
    let mut avg_by_hour = df!("hr" => &hours, "avg_cnt" => &averages)?;
    let mut daily_totals = df!("dteday" => &dates, "cnt" => &totals)?;

    let outputs = [
        (COUNT_BY_HOUR_FILE, &mut count_by_hour),
        (AVG_COUNT_BY_HOUR_FILE, &mut avg_by_hour),
        (DAILY_TOTALS_FILE, &mut daily_totals),
    ];
    let mut paths = Vec::with_capacity(outputs.len());
    for (name, df) in outputs {
        let path = dir.join(name);
        let mut file = File::create(&path).map_err(|e| ForecastError::write(&path, e))?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        debug!(path = %path.display(), rows = df.height(), "summary written");
        paths.push(path);
    }
    Ok(paths)
}
