use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use runmeter_core::prelude::RunResult;
use tokio::process::Command;

use super::command_line::{normalize_script, split_command_line};
use super::{PrepareError, Task};

/// Runs the script as a process. Success means exit code 0.
#[derive(Debug, Clone)]
pub struct ShellTask {
    script: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellArgs {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ShellTask {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl Task for ShellTask {
    type Args = ShellArgs;

    fn prepare(&self) -> Result<Self::Args, PrepareError> {
        let script = normalize_script(&self.script);
        let mut words = split_command_line(&script)
            .map_err(|source| PrepareError::Command {
                script: script.clone(),
                source,
            })?
            .into_iter();

        let program = words.next().ok_or(PrepareError::EmptyScript)?;
        // Every invocation would fail the same way, so a missing program stops the run here.
        let program = which::which(&program)
            .map_err(|source| PrepareError::CommandNotFound { program, source })?;

        Ok(ShellArgs {
            program,
            args: words.collect(),
        })
    }

    async fn run(&self, args: Self::Args) -> RunResult {
        let mut command = Command::new(&args.program);
        command
            .args(&args.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let start = Instant::now();
        match command.status().await {
            Ok(status) => RunResult::new(status.success(), start.elapsed()),
            Err(e) => {
                log::warn!("Failed to run {}: {e}", args.program.display());
                RunResult::failure(start.elapsed())
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn prepare_resolves_program_and_splits_arguments() {
        let args = ShellTask::new("sh -c 'exit 0' \\\n  ignored")
            .prepare()
            .unwrap();

        assert!(args.program.is_absolute());
        assert!(args.program.ends_with("sh"));
        assert_eq!(args.args, vec!["-c", "exit 0", "ignored"]);
    }

    #[test]
    fn prepare_rejects_bad_scripts() {
        assert!(matches!(
            ShellTask::new("echo 'oops").prepare(),
            Err(PrepareError::Command { .. })
        ));
        assert!(matches!(
            ShellTask::new("   ").prepare(),
            Err(PrepareError::EmptyScript)
        ));
        assert!(matches!(
            ShellTask::new("runmeter-no-such-program --flag").prepare(),
            Err(PrepareError::CommandNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn exit_code_decides_success() {
        let ok = ShellTask::new("true");
        let result = ok.run(ok.prepare().unwrap()).await;
        assert!(result.successful);
        assert!(result.duration_ms > 0.0);

        let failing = ShellTask::new("sh -c 'exit 3'");
        let result = failing.run(failing.prepare().unwrap()).await;
        assert!(!result.successful);
    }

    #[tokio::test]
    async fn spawn_failure_is_an_unsuccessful_run() {
        let task = ShellTask::new("true");
        let result = task
            .run(ShellArgs {
                program: PathBuf::from("/nonexistent/runmeter-program"),
                args: vec![],
            })
            .await;

        assert!(!result.successful);
    }

    #[tokio::test]
    async fn output_is_discarded() {
        let task = ShellTask::new("sh -c 'echo to-stdout; echo to-stderr >&2'");
        let result = task.run(task.prepare().unwrap()).await;

        assert!(result.successful);
    }
}
