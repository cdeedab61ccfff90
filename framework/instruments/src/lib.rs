mod report;
pub mod stats;

pub use report::{
    ReportCollector, ScenarioHistory, StatsRow, SummaryReportCollector, WhiskerRow,
    DEFAULT_HISTOGRAM_BINS,
};
