use std::future::Future;

/// Bridges the synchronous hooks to async database clients.
///
/// Every virtual user runs on its own OS thread and blocks on the shared multi-threaded runtime
/// while a statement is in flight.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime) -> Self {
        Self { runtime }
    }

    /// Run async code in place, blocking until it completes.
    ///
    /// The future is never cancelled by the runner. Shutdown is only checked between iterations so
    /// a statement that has started always completes.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        self.runtime.block_on(fut)
    }

    /// Submit async code to be run in the background.
    ///
    /// It is not guaranteed that the runner will wait for the future to complete before shutting
    /// down. In hooks, use [Executor::execute_in_place] instead so that the work completes before
    /// the hook returns.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}
