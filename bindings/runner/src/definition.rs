use std::time::Duration;

use anyhow::Context;
use proxy_bench_runner::prelude::{BenchScenarioCli, ScenarioDefinitionBuilder};

use crate::common::write_summary_artifacts;
use crate::config::{RunConfig, BENCH_PAYLOAD_MODE, BENCH_TARGET};
use crate::context::{PgAgentContext, PgRunnerContext};

/// p95 threshold for scenarios that don't set their own.
const DEFAULT_P95_THRESHOLD: Duration = Duration::from_millis(500);

pub struct PgScenarioDefinitionBuilder {
    inner: ScenarioDefinitionBuilder<PgRunnerContext, PgAgentContext>,
    config: RunConfig,
    default_p95_threshold: Duration,
}

impl PgScenarioDefinitionBuilder {
    /// See [ScenarioDefinitionBuilder::new_with_init].
    ///
    /// Also resolves the [RunConfig] from the environment, failing before anything connects if a
    /// value is invalid.
    pub fn new_with_init(name: &str) -> anyhow::Result<Self> {
        let inner = ScenarioDefinitionBuilder::new_with_init(name);
        let config = RunConfig::from_env().context("Invalid benchmark configuration")?;

        Ok(Self::from_parts(inner, config))
    }

    /// Create a definition from already parsed command line options and configuration.
    pub fn new(name: &str, cli: BenchScenarioCli, config: RunConfig) -> Self {
        Self::from_parts(ScenarioDefinitionBuilder::new(name, cli), config)
    }

    fn from_parts(
        inner: ScenarioDefinitionBuilder<PgRunnerContext, PgAgentContext>,
        config: RunConfig,
    ) -> Self {
        Self {
            inner,
            config,
            default_p95_threshold: DEFAULT_P95_THRESHOLD,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The scenario's own p95 threshold. `BENCH_P95_THRESHOLD` takes precedence when set.
    pub fn with_default_p95_threshold(mut self, threshold: Duration) -> Self {
        self.default_p95_threshold = threshold;
        self
    }

    /// Once the PostgreSQL customisations have been made, use this function to switch back to
    /// configuring hooks for the scenario.
    ///
    /// Applies the configured virtual users, duration and threshold, stores the configuration in
    /// the runner context and writes the benchmark artifacts when the run completes.
    pub fn into_std(self) -> ScenarioDefinitionBuilder<PgRunnerContext, PgAgentContext> {
        let config = self.config;
        let p95_threshold = config.p95_threshold.unwrap_or(self.default_p95_threshold);

        log::info!(
            "Benchmarking {} at {} with {} virtual users for {}",
            config.target,
            config.endpoint(),
            config.vus,
            humantime::format_duration(config.duration)
        );

        self.inner
            .with_vus(config.vus)
            .with_duration(config.duration)
            .with_p95_threshold(p95_threshold)
            .add_env(BENCH_TARGET, config.target.to_string())
            .add_env(BENCH_PAYLOAD_MODE, config.payload_mode.to_string())
            .with_runner_value(PgRunnerContext::new(config))
            .use_summary(write_summary_artifacts)
    }
}
