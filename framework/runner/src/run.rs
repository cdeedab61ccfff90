use std::time::Duration;

use anyhow::Context;
use futures::future::join_all;
use runmeter_core::prelude::ShutdownSignalError;
use runmeter_instruments::{ReportCollector, SummaryReportCollector};
use tokio::sync::mpsc;

use crate::cli::RunmeterCli;
use crate::config::{load_config, ResolvedScenario};
use crate::executor::Executor;
use crate::orchestrator::{tick_interval, Orchestrator, OrchestratorEvent, OrchestratorExit};
use crate::progress::ProgressDisplay;
use crate::scenario::ScenarioRunner;
use crate::shutdown::start_shutdown_listener;
use crate::task::ScenarioTask;

/// How long to wait for blocking work when the runtime shuts down at the end of a run.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct RunOutcome {
    pub exit: OrchestratorExit,
    pub report: SummaryReportCollector,
}

/// Settings that are not part of the config file.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub columns: usize,
    pub show_progress: bool,
}

impl From<&RunmeterCli> for RunSettings {
    fn from(cli: &RunmeterCli) -> Self {
        Self {
            columns: cli.columns,
            show_progress: !cli.no_progress,
        }
    }
}

/// Load the config, run every scenario and print the report.
pub fn run(cli: RunmeterCli) -> anyhow::Result<RunOutcome> {
    let config = load_config(cli.config.as_deref())?;
    let outcome = run_scenarios(config.resolve(), RunSettings::from(&cli))?;

    outcome.report.finalize();
    Ok(outcome)
}

/// Run already resolved scenarios. Nothing is printed apart from the progress bars.
pub fn run_scenarios(
    scenarios: Vec<ResolvedScenario>,
    settings: RunSettings,
) -> anyhow::Result<RunOutcome> {
    // Every script is checked before anything starts.
    let runners = scenarios
        .into_iter()
        .map(|scenario| {
            let name = scenario.name.clone();
            ScenarioTask::for_script(&scenario.script, scenario.parse_curl)
                .and_then(|task| ScenarioRunner::new(scenario, task))
                .with_context(|| format!("Failed to prepare scenario {name}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let names = runners
        .iter()
        .map(|runner| runner.scenario().name.clone())
        .collect::<Vec<_>>();
    let max_duration = runners
        .iter()
        .map(|runner| runner.scenario().duration.as_secs())
        .max()
        .unwrap_or_default();
    let interval = tick_interval(max_duration, settings.columns);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);
    let executor = Executor::new(runtime, shutdown_handle.clone());
    let progress = ProgressDisplay::new(settings.show_progress);

    log::info!("Warming up {} scenarios", runners.len());
    let warmup = executor.execute_in_place(async {
        let bars = runners
            .iter()
            .map(|runner| progress.warmup_bar(&runner.scenario().name))
            .collect::<Vec<_>>();

        join_all(
            runners
                .iter()
                .zip(&bars)
                .map(|(runner, bar)| runner.warmup(|p| bar.set_progress(p))),
        )
        .await;

        bars.iter().for_each(|bar| bar.finish());
        Ok(())
    });

    match warmup {
        Ok(()) => {}
        Err(e) if e.is::<ShutdownSignalError>() => {
            log::info!("Interrupted during warmup, no results to report");
            executor.shutdown(SHUTDOWN_GRACE_PERIOD);
            return Ok(RunOutcome {
                exit: OrchestratorExit::Interrupted {
                    elapsed_seconds: 0.0,
                },
                report: SummaryReportCollector::new(names),
            });
        }
        Err(e) => return Err(e),
    }

    log::info!("Running {} scenarios, ticking every {interval:?}", runners.len());
    let bars = runners
        .iter()
        .map(|runner| {
            let scenario = runner.scenario();
            progress.running_bar(&scenario.name, scenario.duration.as_secs())
        })
        .collect::<Vec<_>>();

    let shutdown_listener = shutdown_handle.new_listener();
    let (exit, report) = executor.execute(async move {
        let handles = runners.into_iter().map(ScenarioRunner::start).collect();
        let orchestrator = Orchestrator::new(handles, interval);
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let consume = async {
            let mut report = SummaryReportCollector::new(names);
            while let Some(event) = receiver.recv().await {
                match event {
                    OrchestratorEvent::Update(update) => {
                        let name = update.name.clone();
                        let elapsed_seconds = update.batch.elapsed_seconds;
                        report.add_update(update);

                        // Bars and report share the configured scenario order.
                        let scenarios = report.scenarios();
                        if let Some(index) = scenarios.iter().position(|s| s.name == name) {
                            if let Some(bar) = bars.get(index) {
                                bar.update(&scenarios[index], elapsed_seconds);
                            }
                        }
                    }
                    OrchestratorEvent::Finished => {
                        bars.iter().for_each(|bar| bar.finish());
                    }
                }
            }
            report
        };

        tokio::join!(orchestrator.run(sender, shutdown_listener), consume)
    });

    executor.shutdown(SHUTDOWN_GRACE_PERIOD);

    Ok(RunOutcome { exit, report })
}
