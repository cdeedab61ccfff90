mod command_line;
mod curl_script;
mod http;
mod shell;

use std::future::Future;

use runmeter_core::prelude::RunResult;

pub use command_line::ParseCommandError;
pub use curl_script::{parse_curl, CurlParseError, CurlRequest};
pub use http::{HttpRequestArgs, HttpTask};
pub use shell::{ShellArgs, ShellTask};

/// One measured unit of work.
///
/// [Task::prepare] turns the scenario script into invocation arguments. It is called once, before
/// any execution, and any error it returns is fatal for the run. [Task::run] executes one
/// invocation and never fails, problems with a single invocation are reported as an unsuccessful
/// [RunResult].
pub trait Task: Send + Sync + 'static {
    type Args: Clone + Send + Sync + 'static;

    fn prepare(&self) -> Result<Self::Args, PrepareError>;

    fn run(&self, args: Self::Args) -> impl Future<Output = RunResult> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
    #[error("Invalid script `{script}`: {source}")]
    Command {
        script: String,
        #[source]
        source: ParseCommandError,
    },
    #[error("Script is empty")]
    EmptyScript,
    #[error("Command `{program}` not found")]
    CommandNotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("Invalid curl script: {0}")]
    Curl(#[from] CurlParseError),
    #[error("Invalid HTTP method `{0}`")]
    InvalidMethod(String),
    #[error("Invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid header `{0}`")]
    InvalidHeader(String),
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// The task variants a scenario can use, picked from its `parse_curl` setting.
#[derive(Debug)]
pub enum ScenarioTask {
    Shell(ShellTask),
    Http(HttpTask),
}

impl ScenarioTask {
    pub fn for_script(script: &str, parse_curl: bool) -> Result<Self, PrepareError> {
        if parse_curl {
            Ok(ScenarioTask::Http(HttpTask::new(script)?))
        } else {
            Ok(ScenarioTask::Shell(ShellTask::new(script)))
        }
    }
}

#[derive(Debug, Clone)]
pub enum ScenarioArgs {
    Shell(ShellArgs),
    Http(HttpRequestArgs),
}

impl Task for ScenarioTask {
    type Args = ScenarioArgs;

    fn prepare(&self) -> Result<Self::Args, PrepareError> {
        match self {
            ScenarioTask::Shell(task) => task.prepare().map(ScenarioArgs::Shell),
            ScenarioTask::Http(task) => task.prepare().map(ScenarioArgs::Http),
        }
    }

    async fn run(&self, args: Self::Args) -> RunResult {
        match (self, args) {
            (ScenarioTask::Shell(task), ScenarioArgs::Shell(args)) => task.run(args).await,
            (ScenarioTask::Http(task), ScenarioArgs::Http(args)) => task.run(args).await,
            _ => {
                log::error!("Task was given arguments prepared by a different task variant");
                RunResult::failure(std::time::Duration::ZERO)
            }
        }
    }
}
