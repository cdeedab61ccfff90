mod summary_report;

use runmeter_core::prelude::ScenarioUpdate;

pub use summary_report::{
    ScenarioHistory, StatsRow, SummaryReportCollector, WhiskerRow, DEFAULT_HISTOGRAM_BINS,
};

/// Consumer of the per-tick update stream.
pub trait ReportCollector {
    fn add_update(&mut self, update: ScenarioUpdate);

    /// Called once, after the last update has been added.
    fn finalize(&self);
}
