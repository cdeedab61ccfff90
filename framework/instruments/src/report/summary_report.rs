mod stats_table;

use runmeter_core::prelude::{Batch, ScenarioUpdate};
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::Table;

use crate::report::ReportCollector;
use crate::stats;

pub use stats_table::{StatsRow, WhiskerRow};

/// Number of bins in the distribution table.
pub const DEFAULT_HISTOGRAM_BINS: usize = 10;

/// Everything one scenario reported, in tick order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioHistory {
    pub name: String,
    pub batches: Vec<Batch>,
    pub concurrent_sessions: usize,
}

impl ScenarioHistory {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn durations(&self) -> Vec<f64> {
        self.batches
            .iter()
            .flat_map(|batch| batch.runs.iter().map(|run| run.duration_ms))
            .collect()
    }

    pub fn finished(&self) -> usize {
        self.batches.iter().map(Batch::successful).sum()
    }

    pub fn errors(&self) -> usize {
        self.batches.iter().map(Batch::errors).sum()
    }

    /// Forward filled mean duration per batch.
    pub fn rolling_means(&self) -> Vec<f64> {
        let batches = self.batches.iter().map(Batch::durations).collect::<Vec<_>>();
        stats::forward_fill_means(batches.iter().map(Vec::as_slice))
    }

    pub fn latest_mean(&self) -> f64 {
        self.rolling_means().last().copied().unwrap_or_default()
    }
}

/// Keeps the full history of every scenario and prints summary tables at the end of the run.
#[derive(Debug)]
pub struct SummaryReportCollector {
    scenarios: Vec<ScenarioHistory>,
    bins: usize,
}

impl SummaryReportCollector {
    /// Scenarios are reported in the order given here. Updates for other names are appended.
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            scenarios: names.into_iter().map(ScenarioHistory::new).collect(),
            bins: DEFAULT_HISTOGRAM_BINS,
        }
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioHistory> {
        self.scenarios.iter().find(|scenario| scenario.name == name)
    }

    pub fn scenarios(&self) -> &[ScenarioHistory] {
        &self.scenarios
    }

    pub fn stats_rows(&self) -> Vec<StatsRow> {
        self.scenarios
            .iter()
            .map(|scenario| {
                let values = scenario.durations();
                StatsRow {
                    name: scenario.name.clone(),
                    q1_ms: stats::quantile(&values, 0.25).ok(),
                    median: stats::median(&values).ok(),
                    q3_ms: stats::quantile(&values, 0.75).ok(),
                    average: stats::mean(&values).ok(),
                    std: stats::standard_deviation(&values).ok(),
                    finished: scenario.finished(),
                    errors: scenario.errors(),
                }
            })
            .collect()
    }

    /// Scenarios without any result are left out.
    pub fn whisker_rows(&self) -> Vec<WhiskerRow> {
        self.scenarios
            .iter()
            .filter_map(|scenario| {
                let whiskers = stats::whisker_stats(&scenario.durations()).ok()?;
                Some(WhiskerRow {
                    name: scenario.name.clone(),
                    min: whiskers.min,
                    lower_whisker: whiskers.lower_whisker,
                    q1: whiskers.q1,
                    median: whiskers.median,
                    q3: whiskers.q3,
                    upper_whisker: whiskers.upper_whisker,
                    max: whiskers.max,
                })
            })
            .collect()
    }

    /// One row per bin and one column per scenario, over the range of all scenarios.
    pub fn distribution_table(&self) -> Option<Table> {
        let durations = self
            .scenarios
            .iter()
            .map(ScenarioHistory::durations)
            .collect::<Vec<_>>();
        let series = durations.iter().map(Vec::as_slice).collect::<Vec<_>>();

        let histograms = match stats::histograms(&series, self.bins) {
            Ok(histograms) => histograms,
            Err(e) => {
                log::debug!("Skipping distribution table: {e}");
                return None;
            }
        };

        let mut builder = Builder::default();
        builder.push_record(
            std::iter::once("duration".to_string())
                .chain(self.scenarios.iter().map(|scenario| scenario.name.clone())),
        );

        let bin_width = histograms.bin_width();
        for bin in 0..histograms.bins() {
            let lower = histograms.min + bin as f64 * bin_width;
            let upper = lower + bin_width;
            builder.push_record(
                std::iter::once(format!("{lower:.2} .. {upper:.2} ms")).chain(
                    histograms
                        .counts
                        .iter()
                        .map(|counts| counts[bin].to_string()),
                ),
            );
        }

        let mut table = builder.build();
        table.with(Style::modern());
        Some(table)
    }

    pub fn render(&self) -> String {
        let mut out = String::from("\nResults\n");

        let mut stats_table = Table::new(self.stats_rows());
        stats_table.with(Style::modern());
        out.push_str(&format!("{stats_table}\n"));

        let whisker_rows = self.whisker_rows();
        if !whisker_rows.is_empty() {
            let mut whisker_table = Table::new(whisker_rows);
            whisker_table.with(Style::modern());
            out.push_str(&format!("\nSpread\n{whisker_table}\n"));
        }

        if let Some(distribution) = self.distribution_table() {
            out.push_str(&format!("\nDistribution\n{distribution}\n"));
        }

        out
    }
}

impl ReportCollector for SummaryReportCollector {
    fn add_update(&mut self, update: ScenarioUpdate) {
        let index = match self
            .scenarios
            .iter()
            .position(|scenario| scenario.name == update.name)
        {
            Some(index) => index,
            None => {
                self.scenarios.push(ScenarioHistory::new(update.name.clone()));
                self.scenarios.len() - 1
            }
        };

        let scenario = &mut self.scenarios[index];
        scenario.concurrent_sessions = update.concurrent_sessions;
        scenario.batches.push(update.batch);
    }

    fn finalize(&self) {
        println!("{}", self.render());
    }
}
