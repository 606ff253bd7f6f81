//! Hourly observation record

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Input column names (UCI bike-sharing hourly layout)
pub const COL_DATE: &str = "dteday";
pub const COL_HOUR: &str = "hr";
pub const COL_WEEKDAY: &str = "weekday";
pub const COL_MONTH: &str = "mnth";
pub const COL_YEAR: &str = "yr";
pub const COL_WORKING_DAY: &str = "workingday";
pub const COL_HOLIDAY: &str = "holiday";
pub const COL_WEATHER: &str = "weathersit";
pub const COL_SEASON: &str = "season";
pub const COL_TEMP: &str = "temp";
pub const COL_FEELS_LIKE: &str = "atemp";
pub const COL_HUMIDITY: &str = "hum";
pub const COL_WIND_SPEED: &str = "windspeed";
pub const COL_COUNT: &str = "cnt";

/// Every column the loader requires
pub const REQUIRED_COLUMNS: [&str; 14] = [
    COL_DATE,
    COL_HOUR,
    COL_WEEKDAY,
    COL_MONTH,
    COL_YEAR,
    COL_WORKING_DAY,
    COL_HOLIDAY,
    COL_WEATHER,
    COL_SEASON,
    COL_TEMP,
    COL_FEELS_LIKE,
    COL_HUMIDITY,
    COL_WIND_SPEED,
    COL_COUNT,
];

/// One hourly observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Calendar date plus hour-of-day offset; the ordering key
    pub timestamp: NaiveDateTime,
    /// Day of week, 0 = Sunday
    pub weekday: u8,
    pub month: u8,
    /// Year as coded in the source (0 = 2011, 1 = 2012 in the UCI data)
    pub year: i32,
    /// Hour of day, 0..=23
    pub hour: u8,
    pub working_day: u8,
    pub holiday: u8,
    /// Weather situation code (1 clear .. 4 heavy precipitation)
    pub weather_situation: u8,
    pub season: u8,
    /// Normalised temperature
    pub temperature: f64,
    /// Normalised feels-like temperature
    pub feels_like_temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    /// Total rentals in the hour
    pub count: u32,
}

impl Record {
    /// Calendar date of the observation
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Number of adjacent record pairs that are not exactly one hour apart.
///
/// Lags are positional, so every gap shifts "k rows ago" away from
/// "k hours ago" for the rows that follow it.
pub fn count_gaps(records: &[Record]) -> usize {
    records
        .windows(2)
        .filter(|pair| (pair[1].timestamp - pair[0].timestamp).num_minutes() != 60)
        .count()
}
