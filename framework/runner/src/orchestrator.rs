use std::time::Duration;

use futures::future::join_all;
use runmeter_core::prelude::{Batch, DelegatedShutdownListener, ScenarioUpdate};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::scenario::ScenarioRunnerHandle;

/// Columns of the live display taken by labels rather than data points.
const DISPLAY_GUTTER: usize = 13;

#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// Sent for every scenario on every tick, even when its batch is empty.
    Update(ScenarioUpdate),
    /// Every scenario is past its duration. Sent once, after the last updates.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrchestratorExit {
    Completed { elapsed_seconds: f64 },
    Interrupted { elapsed_seconds: f64 },
}

impl OrchestratorExit {
    pub fn elapsed_seconds(&self) -> f64 {
        match self {
            OrchestratorExit::Completed { elapsed_seconds }
            | OrchestratorExit::Interrupted { elapsed_seconds } => *elapsed_seconds,
        }
    }
}

/// Tick length that keeps the number of ticks for the longest scenario within the display width.
pub fn tick_interval(max_duration_seconds: u64, columns: usize) -> Duration {
    let width = columns.saturating_sub(DISPLAY_GUTTER).max(1) as u64;
    let millis = max_duration_seconds.saturating_mul(1000).div_ceil(width);

    Duration::from_millis(millis.max(1))
}

/// Drives every running scenario on one shared clock.
///
/// Each scenario keeps its own duration, all of them are measured against the shared elapsed
/// time, which advances by exactly one interval per tick.
pub struct Orchestrator {
    runners: Vec<ScenarioRunnerHandle>,
    interval: Duration,
}

impl Orchestrator {
    pub fn new(runners: Vec<ScenarioRunnerHandle>, interval: Duration) -> Self {
        Self { runners, interval }
    }

    fn elapsed_seconds(&self, ticks: u64) -> f64 {
        (ticks as f64 * self.interval.as_millis() as f64) / 1000.0
    }

    /// Tick until every scenario is finished or shutdown is requested. All runners are stopped
    /// before this returns.
    pub async fn run(
        mut self,
        events: mpsc::UnboundedSender<OrchestratorEvent>,
        mut shutdown: DelegatedShutdownListener,
    ) -> OrchestratorExit {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        log::debug!(
            "Orchestrating {} scenarios with a tick every {:?}",
            self.runners.len(),
            self.interval
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait_for_shutdown() => {
                    let elapsed_seconds = self.elapsed_seconds(ticks);
                    log::info!(
                        "Shutdown requested after {elapsed_seconds:.2}s, stopping all scenarios"
                    );

                    self.flush_all(elapsed_seconds, &events).await;
                    self.stop_all().await;
                    return OrchestratorExit::Interrupted { elapsed_seconds };
                }
                _ = ticker.tick() => {
                    ticks += 1;
                    let elapsed_seconds = self.elapsed_seconds(ticks);

                    // Decided before flushing so the results of the final tick are still sent.
                    let all_finished = self
                        .runners
                        .iter()
                        .all(|runner| runner.is_finished(elapsed_seconds));

                    self.flush_all(elapsed_seconds, &events).await;

                    if all_finished {
                        log::info!("All scenarios finished after {elapsed_seconds:.2}s");
                        self.stop_all().await;
                        if events.send(OrchestratorEvent::Finished).is_err() {
                            log::trace!("Nobody is listening for the finished event");
                        }
                        return OrchestratorExit::Completed { elapsed_seconds };
                    }
                }
            }
        }
    }

    async fn flush_all(
        &self,
        elapsed_seconds: f64,
        events: &mpsc::UnboundedSender<OrchestratorEvent>,
    ) {
        let flushed = join_all(self.runners.iter().map(|runner| runner.flush())).await;

        for (runner, flushed) in self.runners.iter().zip(flushed) {
            let update = ScenarioUpdate {
                name: runner.name().to_string(),
                batch: Batch::new(elapsed_seconds, flushed.runs),
                concurrent_sessions: flushed.concurrent_sessions,
            };
            if events.send(OrchestratorEvent::Update(update)).is_err() {
                log::trace!("Dropping update for {}, nobody is listening", runner.name());
            }
        }
    }

    async fn stop_all(&mut self) {
        join_all(self.runners.iter_mut().map(|runner| runner.stop())).await;
    }
}
