use runmeter_runner::prelude::{init, run, OrchestratorExit, RunmeterResult};

fn main() -> RunmeterResult<()> {
    let cli = init();

    let outcome = run(cli)?;
    if let OrchestratorExit::Interrupted { elapsed_seconds } = outcome.exit {
        log::info!("Run was interrupted after {elapsed_seconds:.2}s");
    }

    Ok(())
}
