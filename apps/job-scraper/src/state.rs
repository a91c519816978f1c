use std::path::PathBuf;

use chrono::NaiveDate;

use crate::analysis::pipeline::AnalysisPipeline;
use crate::report::checkpoint::CheckpointStore;

/// Per-run switches, fixed once the CLI has been parsed.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dev_mode: bool,
    pub lookback_days: i64,
    pub resume: bool,
    pub output_dir: PathBuf,
    /// Stamped into file names and the `scrape_date` column.
    pub run_date: NaiveDate,
}

/// Everything a report session shares across records: options, the
/// checkpoint store and the analysis collaborators.
pub struct RunContext {
    pub options: RunOptions,
    pub checkpoints: CheckpointStore,
    pub pipeline: AnalysisPipeline,
}

impl RunContext {
    pub fn new(options: RunOptions, checkpoints: CheckpointStore, pipeline: AnalysisPipeline) -> Self {
        Self {
            options,
            checkpoints,
            pipeline,
        }
    }
}
