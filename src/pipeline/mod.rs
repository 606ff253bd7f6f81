//! Training pipeline module
//!
//! Orchestrates one sequential batch run and its optional exploratory
//! summaries.

mod runner;
mod summaries;

pub use runner::{PipelineOutcome, TrainingPipeline};
pub use summaries::{
    run_best_effort, write_summaries, AVG_COUNT_BY_HOUR_FILE, COUNT_BY_HOUR_FILE,
    DAILY_TOTALS_FILE,
};
