use postgres_bench_runner::prelude::*;
use std::time::Duration;

const INSERT_EXTRACT: &str =
    "INSERT INTO benchmark_encrypted (id, encrypted_jsonb_extract) VALUES ($1, $2)";
const INSERT_FULL: &str =
    "INSERT INTO benchmark_encrypted (id, encrypted_jsonb_full) VALUES ($1, $2)";
const INSERT_DUAL: &str = "INSERT INTO benchmark_encrypted (id, encrypted_jsonb_extract, encrypted_jsonb_full) VALUES ($1, $2, $3)";

fn agent_behaviour(ctx: &mut AgentContext<PgRunnerContext, PgAgentContext>) -> HookResult {
    let id = random_id();

    let (statement, params) = match ctx.runner_context().get().config().payload_mode {
        PayloadMode::Extract => (
            INSERT_EXTRACT,
            vec![
                SqlParam::Int(id),
                SqlParam::Json(SizeClass::Extract.generate(id)),
            ],
        ),
        PayloadMode::Full => (
            INSERT_FULL,
            vec![SqlParam::Int(id), SqlParam::Json(SizeClass::Full.generate(id))],
        ),
        // Both documents in one statement
        PayloadMode::Dual => (
            INSERT_DUAL,
            vec![
                SqlParam::Int(id),
                SqlParam::Json(SizeClass::Extract.generate(id)),
                SqlParam::Json(SizeClass::Full.generate(id)),
            ],
        ),
    };

    execute(ctx.runner_context(), statement, &params)?;

    Ok(())
}

fn main() -> BenchResult<()> {
    let builder = PgScenarioDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))?
        .with_default_p95_threshold(Duration::from_secs(30));
    log::info!("Payload mode: {}", builder.config().payload_mode);

    let builder = builder
        .into_std()
        .use_setup(open_connection)
        .use_agent_behaviour(agent_behaviour)
        .use_teardown(close_database);

    run(builder)?.ensure_thresholds()
}
