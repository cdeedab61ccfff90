mod cli;
mod config;
mod executor;
mod init;
mod orchestrator;
mod progress;
mod run;
mod scenario;
mod shutdown;
mod task;
mod types;

pub mod prelude {
    pub use crate::cli::RunmeterCli;
    pub use crate::config::{
        load_config, ConfigError, ConfigFile, ConfigIssue, ResolvedScenario, ScenarioConfig,
        SharedConfig, CONFIG_FILE_NAME, DEFAULT_MAX_CONCURRENT_SESSIONS,
    };
    pub use crate::init::init;
    pub use crate::orchestrator::{tick_interval, Orchestrator, OrchestratorEvent, OrchestratorExit};
    pub use crate::run::{run, run_scenarios, RunOutcome, RunSettings};
    pub use crate::scenario::{Flushed, ScenarioRunner, ScenarioRunnerHandle, DEFAULT_POLL_PERIOD};
    pub use crate::task::{
        parse_curl, CurlParseError, CurlRequest, HttpRequestArgs, HttpTask, ParseCommandError,
        PrepareError, ScenarioArgs, ScenarioTask, ShellArgs, ShellTask, Task,
    };
    pub use crate::types::RunmeterResult;
}
