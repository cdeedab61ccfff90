//! One scenario's lifecycle: warmup, then a running phase that keeps the concurrency ceiling
//! saturated until it is stopped.
//!
//! The running phase is an actor that owns all of the scenario's mutable state. The orchestrator
//! talks to it through a [ScenarioRunnerHandle] and each launched execution reports back over a
//! channel, so nothing is shared between the executions and the bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use runmeter_core::prelude::{RunResult, Semaphore};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::config::ResolvedScenario;
use crate::task::{PrepareError, Task};

/// How often the running phase checks for free slots.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(10);

pub struct ScenarioRunner<T: Task> {
    scenario: ResolvedScenario,
    task: Arc<T>,
    args: T::Args,
}

impl<T: Task> ScenarioRunner<T> {
    /// Prepares the task arguments once, up front.
    pub fn new(scenario: ResolvedScenario, task: T) -> Result<Self, PrepareError> {
        let args = task.prepare()?;

        Ok(Self {
            scenario,
            task: Arc::new(task),
            args,
        })
    }

    pub fn scenario(&self) -> &ResolvedScenario {
        &self.scenario
    }

    /// Run `warmups` executions, at most `max_concurrent_sessions` at a time.
    ///
    /// `on_progress` receives `completed / warmups` after every completion. The results are
    /// returned so they stay out of the running phase statistics.
    pub async fn warmup(&self, mut on_progress: impl FnMut(f64)) -> Vec<RunResult> {
        let warmups = self.scenario.warmups;
        if warmups == 0 {
            return Vec::new();
        }
        if self.scenario.max_concurrent_sessions == 0 {
            log::warn!(
                "Scenario {} allows no concurrent sessions, skipping warmup",
                self.scenario.name
            );
            return Vec::new();
        }

        log::debug!("Warming up scenario {} with {warmups} runs", self.scenario.name);

        let semaphore = Arc::new(Semaphore::new(self.scenario.max_concurrent_sessions));
        let mut join_set = JoinSet::new();
        for _ in 0..warmups {
            let semaphore = semaphore.clone();
            let task = self.task.clone();
            let args = self.args.clone();
            join_set.spawn(async move {
                semaphore
                    .with_semaphore(|| async move { task.run(args).await })
                    .await
            });
        }

        let mut results = Vec::with_capacity(warmups);
        while let Some(joined) = join_set.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                log::warn!("Warmup run for {} did not complete: {e}", self.scenario.name);
                RunResult::failure(Duration::ZERO)
            });
            results.push(result);
            on_progress(results.len() as f64 / warmups as f64);
        }

        log::debug!("Warmup finished for scenario {}", self.scenario.name);
        results
    }

    pub fn start(self) -> ScenarioRunnerHandle {
        self.start_with_poll_period(DEFAULT_POLL_PERIOD)
    }

    /// Start the running phase. Must be called from within a Tokio runtime.
    pub fn start_with_poll_period(self, poll_period: Duration) -> ScenarioRunnerHandle {
        let (command_sender, command_receiver) = mpsc::unbounded_channel();
        let (completion_sender, completion_receiver) = mpsc::unbounded_channel();

        log::info!("Starting scenario {}", self.scenario.name);

        let state = RunnerState {
            task: self.task,
            args: self.args,
            max_concurrent_sessions: self.scenario.max_concurrent_sessions,
            concurrent_sessions: 0,
            results: Vec::new(),
            completion_sender,
        };
        let actor = tokio::spawn(state.run(command_receiver, completion_receiver, poll_period));

        ScenarioRunnerHandle {
            name: self.scenario.name,
            duration_seconds: self.scenario.duration.as_secs(),
            commands: command_sender,
            actor: Some(actor),
        }
    }
}

/// Results drained from a running scenario.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flushed {
    /// In completion order.
    pub runs: Vec<RunResult>,
    pub concurrent_sessions: usize,
}

#[derive(Debug)]
enum Command {
    Flush(oneshot::Sender<Flushed>),
    Stop,
}

struct RunnerState<T: Task> {
    task: Arc<T>,
    args: T::Args,
    max_concurrent_sessions: usize,
    concurrent_sessions: usize,
    results: Vec<RunResult>,
    completion_sender: mpsc::UnboundedSender<RunResult>,
}

impl<T: Task> RunnerState<T> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<RunResult>,
        poll_period: Duration,
    ) {
        let mut poll = tokio::time::interval(poll_period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Flush(reply)) => {
                        while let Ok(result) = completions.try_recv() {
                            self.complete(result);
                        }
                        // The requester may have gone away, the results are dropped with it.
                        let _ = reply.send(self.flush());
                    }
                    Some(Command::Stop) | None => break,
                },
                Some(result) = completions.recv() => {
                    self.complete(result);
                    self.fill();
                }
                _ = poll.tick() => self.fill(),
            }
        }

        log::debug!(
            "Runner stopped with {} executions still in flight",
            self.concurrent_sessions
        );
    }

    fn fill(&mut self) {
        while self.concurrent_sessions < self.max_concurrent_sessions {
            self.launch();
        }
    }

    fn launch(&mut self) {
        self.concurrent_sessions += 1;

        let task = self.task.clone();
        let args = self.args.clone();
        let completion_sender = self.completion_sender.clone();
        tokio::spawn(async move {
            let result = task.run(args).await;
            // Fails once the runner has stopped, the result is discarded.
            let _ = completion_sender.send(result);
        });
    }

    fn complete(&mut self, result: RunResult) {
        self.concurrent_sessions = self.concurrent_sessions.saturating_sub(1);
        self.results.push(result);
    }

    fn flush(&mut self) -> Flushed {
        Flushed {
            runs: std::mem::take(&mut self.results),
            concurrent_sessions: self.concurrent_sessions,
        }
    }
}

/// Control of a scenario in its running phase.
///
/// Dropping the handle stops the launch loop as well.
#[derive(Debug)]
pub struct ScenarioRunnerHandle {
    name: String,
    duration_seconds: u64,
    commands: mpsc::UnboundedSender<Command>,
    actor: Option<JoinHandle<()>>,
}

impl ScenarioRunnerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    /// True once `elapsed_seconds` is strictly past the configured duration.
    pub fn is_finished(&self, elapsed_seconds: f64) -> bool {
        elapsed_seconds > self.duration_seconds as f64
    }

    /// Take every result that completed since the last flush.
    ///
    /// Returns nothing once the runner has been stopped.
    pub async fn flush(&self) -> Flushed {
        let (reply, receiver) = oneshot::channel();
        if self.commands.send(Command::Flush(reply)).is_err() {
            return Flushed::default();
        }

        receiver.await.unwrap_or_default()
    }

    /// Stop launching new executions. Executions already in flight are left to finish and their
    /// results are ignored. Stopping more than once does nothing.
    pub async fn stop(&mut self) {
        let Some(actor) = self.actor.take() else {
            return;
        };

        // The actor may already be gone, in which case there is nothing to stop.
        let _ = self.commands.send(Command::Stop);
        if let Err(e) = actor.await {
            log::warn!("Runner for scenario {} did not stop cleanly: {e}", self.name);
        }
        log::debug!("Stopped scenario {}", self.name);
    }
}
