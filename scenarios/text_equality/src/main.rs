use postgres_bench_runner::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const TABLE: &str = "benchmark_encrypted";
const INSERT: &str = "INSERT INTO benchmark_encrypted (id, username, email) VALUES ($1, $2, $3)";
const QUERY: &str = "SELECT username FROM benchmark_encrypted WHERE email = $1";

fn setup(ctx: &mut RunnerContext<PgRunnerContext>) -> HookResult {
    open_pool(ctx)?;
    reset_seed_range(ctx, TABLE, EQUALITY_RANGE, INSERT, |index, id| {
        let (username, email) = equality_seed(index);
        vec![SqlParam::Int(id), SqlParam::Text(username), SqlParam::Text(email)]
    })
}

fn agent_behaviour(ctx: &mut AgentContext<PgRunnerContext, PgAgentContext>) -> HookResult {
    execute(
        ctx.runner_context(),
        QUERY,
        &[SqlParam::Text(equality_probe(EQUALITY_RANGE))],
    )?;

    Ok(())
}

fn teardown(ctx: Arc<RunnerContext<PgRunnerContext>>) -> HookResult {
    teardown_seed_range(ctx, TABLE, EQUALITY_RANGE)
}

fn main() -> BenchResult<()> {
    let builder = PgScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))?
        .with_default_p95_threshold(Duration::from_millis(100))
        .into_std()
        .use_setup(setup)
        .use_agent_behaviour(agent_behaviour)
        .use_teardown(teardown);

    run(builder)?.ensure_thresholds()
}
