use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct RunmeterCli {
    /// The config file describing the scenarios to run. Defaults to `runmeter.toml` in the current
    /// directory.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    /// Width of the terminal. The orchestrator ticks often enough to fill this many columns over
    /// the longest scenario.
    #[clap(long, env = "COLUMNS", default_value_t = 80)]
    pub columns: usize,

    /// Do not show progress bars on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bars aren't being looked at by anyone and are just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = RunmeterCli::try_parse_from(["runmeter", "--columns", "120"]).unwrap();

        assert_eq!(cli.config, None);
        assert_eq!(cli.columns, 120);
        assert!(!cli.no_progress);
    }

    #[test]
    fn all_options() {
        let cli = RunmeterCli::try_parse_from([
            "runmeter",
            "-c",
            "bench/runmeter.toml",
            "--columns",
            "100",
            "--no-progress",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("bench/runmeter.toml")));
        assert_eq!(cli.columns, 100);
        assert!(cli.no_progress);
    }
}
