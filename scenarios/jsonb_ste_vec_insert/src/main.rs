use postgres_bench_runner::prelude::*;
use std::time::Duration;

const INSERT: &str =
    "INSERT INTO benchmark_encrypted (id, encrypted_jsonb_with_ste_vec) VALUES ($1, $2)";

fn agent_behaviour(ctx: &mut AgentContext<PgRunnerContext, PgAgentContext>) -> HookResult {
    let id = random_id();
    execute(
        ctx.runner_context(),
        INSERT,
        &[SqlParam::Int(id), SqlParam::Json(standard_jsonb(id))],
    )?;

    Ok(())
}

fn main() -> BenchResult<()> {
    let builder = PgScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))?
        .with_default_p95_threshold(Duration::from_millis(500))
        .into_std()
        .use_setup(open_connection)
        .use_agent_behaviour(agent_behaviour)
        .use_teardown(close_database);

    run(builder)?.ensure_thresholds()
}
