//! Artifact persistence module
//!
//! - Model bundle (fitted parameters, feature schema, lag set)
//! - Metrics record (holdout MAE, baseline MAE, provenance)
//! - Atomic JSON writes into the artifacts directory

mod bundle;
mod metrics;
mod writer;

pub use bundle::{TrainedModelBundle, BUNDLE_FORMAT_VERSION};
pub use metrics::{MetricsRecord, LINEAR_BASELINE_KEY};
pub use writer::{write_json_atomic, ReportWriter, METRICS_FILE, MODEL_FILE};
