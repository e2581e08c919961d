use std::{fmt::Debug, sync::Arc};

use proxy_bench_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use proxy_bench_instruments::Reporter;

use crate::executor::Executor;

pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

/// State shared by the whole run.
///
/// The setup hook gets mutable access, after which the context is frozen behind an [Arc] and shared
/// with every virtual user and the teardown hook.
#[derive(Debug)]
pub struct RunnerContext<RV: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    run_id: String,
    value: RV,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        run_id: String,
        value: RV,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            run_id,
            value,
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Stop starting new iterations. Iterations already in flight complete and teardown still runs.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// State owned by a single virtual user.
pub struct AgentContext<RV: UserValuesConstraint, AV: UserValuesConstraint> {
    agent_index: usize,
    agent_name: String,
    runner_context: Arc<RunnerContext<RV>>,
    shutdown_listener: DelegatedShutdownListener,
    value: AV,
}

impl<RV: UserValuesConstraint, AV: UserValuesConstraint> AgentContext<RV, AV> {
    pub(crate) fn new(
        agent_index: usize,
        agent_name: String,
        runner_context: Arc<RunnerContext<RV>>,
        shutdown_listener: DelegatedShutdownListener,
    ) -> Self {
        Self {
            agent_index,
            agent_name,
            runner_context,
            shutdown_listener,
            value: Default::default(),
        }
    }

    /// Zero based index of this virtual user.
    pub fn agent_index(&self) -> usize {
        self.agent_index
    }

    /// The name of this virtual user, which is also the name of its thread.
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    pub fn shutdown_listener(&mut self) -> &mut DelegatedShutdownListener {
        &mut self.shutdown_listener
    }

    pub fn get_mut(&mut self) -> &mut AV {
        &mut self.value
    }

    pub fn get(&self) -> &AV {
        &self.value
    }
}
