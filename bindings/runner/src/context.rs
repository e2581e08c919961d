use anyhow::Context;
use postgres_client_instrumented::prelude::BenchDatabase;
use proxy_bench_runner::prelude::UserValuesConstraint;

use crate::config::RunConfig;

/// Runner context values for PostgreSQL scenarios.
///
/// Holds the resolved configuration and, once the setup hook has opened it, the connection to the
/// benchmark target.
#[derive(Debug, Default)]
pub struct PgRunnerContext {
    config: RunConfig,
    pub(crate) database: Option<BenchDatabase>,
}

impl UserValuesConstraint for PgRunnerContext {}

impl PgRunnerContext {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            database: None,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn database(&self) -> anyhow::Result<&BenchDatabase> {
        self.database.as_ref().context(
            "No database connection, did you forget to call `open_pool` or `open_connection` in your setup?",
        )
    }
}

/// Virtual users share the runner's connection, so they carry no state of their own.
#[derive(Debug, Default)]
pub struct PgAgentContext;

impl UserValuesConstraint for PgAgentContext {}
