//! Input data: the hourly record type and its loader

mod loader;
mod record;

pub use loader::TimeSeriesLoader;
pub use record::{count_gaps, Record, REQUIRED_COLUMNS};

#[cfg(test)]
pub(crate) use record::fixtures;
