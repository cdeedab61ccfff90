use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use runmeter_instruments::ScenarioHistory;

/// Warmup progress is tracked in per mille.
const WARMUP_STEPS: u64 = 1000;

/// Live progress bars for every scenario, one set during warmup and one while running.
///
/// Hidden bars are used when progress is disabled, so callers don't need to care.
pub struct ProgressDisplay {
    multi: MultiProgress,
}

impl ProgressDisplay {
    pub fn new(enabled: bool) -> Self {
        let multi = if enabled {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        Self { multi }
    }

    pub fn warmup_bar(&self, name: &str) -> WarmupBar {
        let bar = self.multi.add(ProgressBar::new(WARMUP_STEPS));
        bar.set_style(style(
            "{prefix:>16.bold} warmup  [{bar:40.yellow/blue}] {percent:>3}%",
        ));
        bar.set_prefix(name.to_string());

        WarmupBar { bar }
    }

    pub fn running_bar(&self, name: &str, duration_seconds: u64) -> RunningBar {
        let length = duration_seconds.saturating_mul(1000);
        let bar = self.multi.add(ProgressBar::new(length));
        bar.set_style(style(
            "{prefix:>16.bold} running [{bar:40.cyan/blue}] {elapsed_precise} {msg}",
        ));
        bar.set_prefix(name.to_string());

        RunningBar { bar, length }
    }
}

fn style(template: &str) -> ProgressStyle {
    match ProgressStyle::with_template(template) {
        Ok(style) => style.progress_chars("#>-"),
        Err(e) => {
            log::warn!("Invalid progress template, using the default: {e}");
            ProgressStyle::default_bar()
        }
    }
}

pub struct WarmupBar {
    bar: ProgressBar,
}

impl WarmupBar {
    /// `progress` is the completed fraction in `[0, 1]`.
    pub fn set_progress(&self, progress: f64) {
        let position = (progress.clamp(0.0, 1.0) * WARMUP_STEPS as f64).round() as u64;
        self.bar.set_position(position);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

pub struct RunningBar {
    bar: ProgressBar,
    length: u64,
}

impl RunningBar {
    pub fn update(&self, history: &ScenarioHistory, elapsed_seconds: f64) {
        let elapsed_millis = (elapsed_seconds * 1000.0).round() as u64;
        self.bar.set_position(elapsed_millis.min(self.length));
        self.bar.set_message(status_message(history));
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}

fn status_message(history: &ScenarioHistory) -> String {
    format!(
        "{} in flight | {} ok | {} errors | mean {:.2} ms",
        history.concurrent_sessions,
        history.finished(),
        history.errors(),
        history.latest_mean()
    )
}
