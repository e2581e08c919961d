use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use proxy_bench_summary_model::RunSummary;

use crate::cli::BenchScenarioCli;
use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;
pub type GlobalHook<RV> = fn(Arc<RunnerContext<RV>>) -> HookResult;
pub type AgentHookMut<RV, AV> = fn(&mut AgentContext<RV, AV>) -> HookResult;
pub type SummaryHook<RV> = fn(&RunnerContext<RV>, &RunSummary) -> HookResult;

const DEFAULT_VUS: usize = 1;
const DEFAULT_DURATION: Duration = Duration::from_secs(30);

/// The builder for a scenario definition.
///
/// This must be used at the start of a scenario binary to define the workload that you want to run.
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, AV: UserValuesConstraint> {
    /// The name of the scenario, which is also the prefix of its benchmark artifacts.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: BenchScenarioCli,
    /// The number of virtual users that run the behaviour concurrently.
    vus: usize,
    /// How long new iterations are started for.
    duration: Duration,
    /// Upper bound for the 95th percentile iteration duration.
    p95_threshold: Option<Duration>,
    runner_value: Option<RV>,
    env: HashMap<String, String>,
    /// Global setup hook for this scenario. It will be run once, before any virtual users are started.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// The iteration run in a loop by every virtual user.
    agent_behaviour: Option<AgentHookMut<RV, AV>>,
    /// Global teardown hook for this scenario. It will be run once, after all virtual users have
    /// stopped.
    teardown_fn: Option<GlobalHook<RV>>,
    /// Receives the run summary once the statistics have been computed.
    summary_fn: Option<SummaryHook<RV>>,
}

pub(crate) struct ScenarioDefinition<RV: UserValuesConstraint, AV: UserValuesConstraint> {
    pub(crate) name: String,
    pub(crate) no_progress: bool,
    pub(crate) reporter: crate::cli::ReporterOpt,
    pub(crate) run_id: Option<String>,
    pub(crate) vus: usize,
    pub(crate) duration: Duration,
    pub(crate) p95_threshold: Option<Duration>,
    pub(crate) runner_value: RV,
    pub(crate) env: HashMap<String, String>,
    pub(crate) setup_fn: Option<GlobalHookMut<RV>>,
    pub(crate) agent_behaviour: AgentHookMut<RV, AV>,
    pub(crate) teardown_fn: Option<GlobalHook<RV>>,
    pub(crate) summary_fn: Option<SummaryHook<RV>>,
}

impl<RV: UserValuesConstraint, AV: UserValuesConstraint> ScenarioDefinitionBuilder<RV, AV> {
    /// Create a scenario definition from the scenario name and already parsed command line options.
    pub fn new(name: &str, cli: BenchScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            vus: DEFAULT_VUS,
            duration: DEFAULT_DURATION,
            p95_threshold: None,
            runner_value: None,
            env: HashMap::new(),
            setup_fn: None,
            agent_behaviour: None,
            teardown_fn: None,
            summary_fn: None,
        }
    }

    /// Initialise logging, parse the command line and create a scenario definition.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, crate::init::init())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_vus(mut self, vus: usize) -> Self {
        self.vus = vus;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Fail the run if the 95th percentile iteration duration is not below `threshold`.
    pub fn with_p95_threshold(mut self, threshold: Duration) -> Self {
        self.p95_threshold = Some(threshold);
        self
    }

    /// Start the run with this value in the runner context instead of `RV::default()`.
    pub fn with_runner_value(mut self, value: RV) -> Self {
        self.runner_value = Some(value);
        self
    }

    /// Record a configuration value in the run summary.
    pub fn add_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the global setup hook [ScenarioDefinitionBuilder::setup_fn] for this scenario.
    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    /// Set the iteration [ScenarioDefinitionBuilder::agent_behaviour] for this scenario.
    pub fn use_agent_behaviour(mut self, behaviour: AgentHookMut<RV, AV>) -> Self {
        self.agent_behaviour = Some(behaviour);
        self
    }

    /// Set the global teardown hook [ScenarioDefinitionBuilder::teardown_fn] for this scenario.
    pub fn use_teardown(mut self, teardown_fn: GlobalHook<RV>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    /// Set the summary hook [ScenarioDefinitionBuilder::summary_fn] for this scenario.
    pub fn use_summary(mut self, summary_fn: SummaryHook<RV>) -> Self {
        self.summary_fn = Some(summary_fn);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<RV, AV>> {
        let Some(agent_behaviour) = self.agent_behaviour else {
            bail!("Scenario [{}] has no agent behaviour", self.name);
        };

        if self.vus == 0 {
            bail!("Scenario [{}] needs at least one virtual user", self.name);
        }

        if self.duration.is_zero() {
            bail!("Scenario [{}] has a zero duration", self.name);
        }

        Ok(ScenarioDefinition {
            name: self.name,
            no_progress: self.cli.no_progress,
            reporter: self.cli.reporter,
            run_id: self.cli.run_id,
            vus: self.vus,
            duration: self.duration,
            p95_threshold: self.p95_threshold,
            runner_value: self.runner_value.unwrap_or_default(),
            env: self.env,
            setup_fn: self.setup_fn,
            agent_behaviour,
            teardown_fn: self.teardown_fn,
            summary_fn: self.summary_fn,
        })
    }
}
