use postgres_bench_runner::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const TABLE: &str = "encrypted";
const INSERT: &str = "INSERT INTO encrypted (id, encrypted_jsonb) VALUES ($1, $2)";
const QUERY: &str =
    "SELECT id FROM encrypted WHERE encrypted_jsonb @> $1 AND id BETWEEN $2 AND $3";

fn setup(ctx: &mut RunnerContext<PgRunnerContext>) -> HookResult {
    open_pool(ctx)?;
    reset_seed_range(ctx, TABLE, CONTAINMENT_RANGE, INSERT, |index, id| {
        vec![SqlParam::Int(id), SqlParam::Json(containment_seed(id, index))]
    })
}

fn agent_behaviour(ctx: &mut AgentContext<PgRunnerContext, PgAgentContext>) -> HookResult {
    execute(
        ctx.runner_context(),
        QUERY,
        &[
            SqlParam::Json(containment_pattern()),
            SqlParam::Int(CONTAINMENT_RANGE.start),
            SqlParam::Int(CONTAINMENT_RANGE.end()),
        ],
    )?;

    Ok(())
}

fn teardown(ctx: Arc<RunnerContext<PgRunnerContext>>) -> HookResult {
    teardown_seed_range(ctx, TABLE, CONTAINMENT_RANGE)
}

fn main() -> BenchResult<()> {
    let builder = PgScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))?
        .with_default_p95_threshold(Duration::from_millis(200))
        .into_std()
        .use_setup(setup)
        .use_agent_behaviour(agent_behaviour)
        .use_teardown(teardown);

    run(builder)?.ensure_thresholds()
}
