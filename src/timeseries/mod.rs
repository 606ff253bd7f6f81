//! Time series module
//!
//! Feature construction and temporal evaluation plumbing:
//! - Calendar and cyclic-hour features
//! - Autoregressive lag features over sequence position
//! - Valid-window filtering of the lag warm-up rows
//! - Chronological (non-shuffled) holdout splitting

mod features;
mod validation;

pub use features::{lag_column, FeatureBuilder, FeatureMatrix, FeatureRow, BASE_FEATURE_COLUMNS};
pub use validation::{ChronologicalSplitter, SeriesView, Split, WindowFilter};
