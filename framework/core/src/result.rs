use std::time::Duration;

/// Outcome of one measured execution.
///
/// `duration_ms` covers the execution only, preparing the invocation is not included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunResult {
    pub successful: bool,
    pub duration_ms: f64,
}

impl RunResult {
    pub fn new(successful: bool, elapsed: Duration) -> Self {
        Self {
            successful,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
        }
    }

    pub fn success(elapsed: Duration) -> Self {
        Self::new(true, elapsed)
    }

    pub fn failure(elapsed: Duration) -> Self {
        Self::new(false, elapsed)
    }
}

/// Results one scenario produced between two orchestrator ticks, in completion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Shared elapsed time at the tick that flushed this batch.
    pub elapsed_seconds: f64,
    pub runs: Vec<RunResult>,
}

impl Batch {
    pub fn new(elapsed_seconds: f64, runs: Vec<RunResult>) -> Self {
        Self {
            elapsed_seconds,
            runs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn successful(&self) -> usize {
        self.runs.iter().filter(|run| run.successful).count()
    }

    pub fn errors(&self) -> usize {
        self.runs.len() - self.successful()
    }

    pub fn durations(&self) -> Vec<f64> {
        self.runs.iter().map(|run| run.duration_ms).collect()
    }
}

/// What the orchestrator forwards for every scenario on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioUpdate {
    pub name: String,
    pub batch: Batch,
    pub concurrent_sessions: usize,
}
