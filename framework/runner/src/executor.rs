use std::future::Future;
use std::time::Duration;

use runmeter_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// Owns the Tokio runtime for a run.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// Note that the future will be cancelled if the run is shutdown, in which case the error is a
    /// [ShutdownSignalError].
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Run async code in place without racing it against shutdown. The future is expected to
    /// watch for shutdown itself.
    pub fn execute<T>(&self, fut: impl Future<Output = T>) -> T {
        self.runtime.block_on(fut)
    }

    /// Shut the runtime down, waiting at most `grace_period` for blocking work. Anything still
    /// pending, such as waits on child processes, is dropped so it cannot keep the process alive.
    pub fn shutdown(self, grace_period: Duration) {
        self.runtime.shutdown_timeout(grace_period);
    }
}
