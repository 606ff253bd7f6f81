//! Shared fixtures for integration tests

use chrono::{Datelike, Duration, NaiveDate};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: &str =
    "instant,dteday,season,yr,mnth,hr,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,casual,registered,cnt";

/// Hourly CSV starting 2011-01-01 00:00; `count(i)` gives row i's target
pub fn hourly_csv(n: usize, count: impl Fn(usize) -> u32) -> String {
    let start = NaiveDate::from_ymd_opt(2011, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let mut out = String::from(HEADER);
    out.push('\n');
    for i in 0..n {
        let ts = start + Duration::hours(i as i64);
        let weekday = ts.weekday().num_days_from_sunday();
        let working = u8::from(weekday != 0 && weekday != 6);
        let hour = i % 24;
        let cnt = count(i);
        writeln!(
            out,
            "{},{},1,0,{},{},0,{},{},{},{:.2},{:.4},{:.2},{:.4},0,{},{}",
            i + 1,
            ts.date().format("%Y-%m-%d"),
            ts.month(),
            hour,
            weekday,
            working,
            1 + i % 3,
            0.2 + 0.01 * hour as f64,
            0.25,
            0.6,
            0.1,
            cnt,
            cnt
        )
        .unwrap();
    }
    out
}

/// Count rising by one per hour
pub fn linear_counts(i: usize) -> u32 {
    i as u32
}

/// Daily cycle with a weekday offset
pub fn seasonal_counts(i: usize) -> u32 {
    let hour = (i % 24) as f64;
    let day = (i / 24) % 7;
    let cycle = (hour / 24.0 * std::f64::consts::TAU).sin();
    (120.0 + 80.0 * cycle + 6.0 * day as f64).round() as u32
}

/// Write `csv` as `<dir>/data/hour.csv`, returning the data directory
pub fn write_data(dir: &Path, csv: &str) -> PathBuf {
    let data_dir = dir.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("hour.csv"), csv).unwrap();
    data_dir
}
