use crate::cli::RunmeterCli;
use clap::Parser;

/// Initialise the CLI and logging for runmeter.
pub fn init() -> RunmeterCli {
    env_logger::init();

    RunmeterCli::parse()
}
