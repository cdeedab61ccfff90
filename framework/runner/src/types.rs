/// Error type for the runmeter entry points. Configuration and preparation errors are converted
/// into it with their full detail, so `?` can be used to propagate them.
pub type RunmeterResult<T> = anyhow::Result<T>;
