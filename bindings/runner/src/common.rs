use std::sync::Arc;

use anyhow::Context;
use postgres_client_instrumented::prelude::{BenchDatabase, ExecuteOutcome, SqlParam};
use proxy_bench_runner::prelude::{BenchResult, HookResult, RunSummary, RunnerContext};
use proxy_bench_summary_model::BenchmarkArtifacts;

use crate::context::PgRunnerContext;
use crate::data::SeedRange;

/// Open a bounded connection pool to the configured target and store it in the runner context.
///
/// Use this in the setup hook of scenarios that run many statements concurrently:
/// ```rust,no_run
/// use postgres_bench_runner::prelude::{open_pool, HookResult, PgRunnerContext, RunnerContext};
///
/// fn setup(ctx: &mut RunnerContext<PgRunnerContext>) -> HookResult {
///     open_pool(ctx)?;
///     Ok(())
/// }
/// ```
pub fn open_pool(ctx: &mut RunnerContext<PgRunnerContext>) -> HookResult {
    let config = ctx.get().config();
    let options = config.connect_options();
    let (min, max) = (config.pool_min, config.pool_max);
    let description = format!("{} at {}", config.target, config.endpoint());
    let reporter = ctx.reporter();

    log::info!("Opening connection pool ({min}..={max}) to {description}");
    let database = ctx
        .executor()
        .execute_in_place(BenchDatabase::connect_pool(options, min, max, reporter))
        .with_context(|| format!("Failed to connect to {description}"))?;

    ctx.get_mut().database = Some(database);
    Ok(())
}

/// Open a single session to the configured target and store it in the runner context.
///
/// Statements from all virtual users are serialized on this session.
pub fn open_connection(ctx: &mut RunnerContext<PgRunnerContext>) -> HookResult {
    let config = ctx.get().config();
    let options = config.connect_options();
    let description = format!("{} at {}", config.target, config.endpoint());
    let reporter = ctx.reporter();

    log::info!("Opening single connection to {description}");
    let database = ctx
        .executor()
        .execute_in_place(BenchDatabase::connect_single(options, reporter))
        .with_context(|| format!("Failed to connect to {description}"))?;

    ctx.get_mut().database = Some(database);
    Ok(())
}

/// Execute a statement on the runner's connection, blocking until it completes.
pub fn execute(
    ctx: &RunnerContext<PgRunnerContext>,
    statement: &str,
    params: &[SqlParam],
) -> BenchResult<ExecuteOutcome> {
    let database = ctx.get().database()?;
    ctx.executor()
        .execute_in_place(database.execute(statement, params))
}

/// Delete every row of `table` whose id is in `range`.
pub fn delete_seed_range(
    ctx: &RunnerContext<PgRunnerContext>,
    table: &str,
    range: SeedRange,
) -> BenchResult<u64> {
    let statement = format!("DELETE FROM {table} WHERE id BETWEEN $1 AND $2");
    let outcome = execute(
        ctx,
        &statement,
        &[SqlParam::Int(range.start), SqlParam::Int(range.end())],
    )
    .with_context(|| {
        format!(
            "Failed to clear ids {}..={} with `{statement}`",
            range.start,
            range.end()
        )
    })?;

    log::debug!(
        "Deleted {} rows from {table} in ids {}..={}",
        outcome.rows_affected,
        range.start,
        range.end()
    );
    Ok(outcome.rows_affected)
}

/// Replace the rows in `range` with fresh seed rows.
///
/// Rows left behind by an interrupted run are deleted first, so running this twice leaves exactly
/// `range.count` rows. `params` maps `(index, id)` to the parameters of `insert`.
///
/// Teardown does not run when setup fails, so the connection is closed here if seeding fails.
pub fn reset_seed_range(
    ctx: &RunnerContext<PgRunnerContext>,
    table: &str,
    range: SeedRange,
    insert: &str,
    params: impl Fn(i32, i32) -> Vec<SqlParam>,
) -> HookResult {
    let seeded = seed_range(ctx, table, range, insert, params);
    close_on_setup_error(ctx, seeded)
}

fn seed_range(
    ctx: &RunnerContext<PgRunnerContext>,
    table: &str,
    range: SeedRange,
    insert: &str,
    params: impl Fn(i32, i32) -> Vec<SqlParam>,
) -> HookResult {
    delete_seed_range(ctx, table, range)?;

    for (index, id) in range.ids() {
        execute(ctx, insert, &params(index, id)).with_context(|| {
            format!(
                "Failed to seed id {id} of {}..={} with `{insert}`",
                range.start,
                range.end()
            )
        })?;
    }

    log::info!(
        "Seeded {} rows into {table} in ids {}..={}",
        range.count,
        range.start,
        range.end()
    );
    Ok(())
}

/// Close the runner's connection. Use this as, or at the end of, the teardown hook.
pub fn close_database(ctx: Arc<RunnerContext<PgRunnerContext>>) -> HookResult {
    close_handle(&ctx)
}

/// Close the runner's connection when `result` is an error, then return `result` unchanged.
///
/// Use this for setup steps that run after the connection was opened. A failure to close is only
/// logged so that the setup error is the one reported.
pub fn close_on_setup_error<T>(
    ctx: &RunnerContext<PgRunnerContext>,
    result: BenchResult<T>,
) -> BenchResult<T> {
    if result.is_err() {
        if let Err(e) = close_handle(ctx) {
            log::warn!("Failed to close the database connection after setup failed: {e:?}");
        }
    }
    result
}

fn close_handle(ctx: &RunnerContext<PgRunnerContext>) -> HookResult {
    let database = ctx.get().database()?;
    let closed = ctx
        .executor()
        .execute_in_place(database.close())
        .context("Failed to close the database connection")?;

    if closed {
        log::info!("Closed connection to {}", ctx.get().config().endpoint());
    }
    Ok(())
}

/// Delete the seed rows in `range`, then close the connection.
///
/// The connection is closed even if the delete fails, in which case the delete error is returned.
pub fn teardown_seed_range(
    ctx: Arc<RunnerContext<PgRunnerContext>>,
    table: &str,
    range: SeedRange,
) -> HookResult {
    let cleared = delete_seed_range(&ctx, table, range);
    close_database(ctx)?;
    cleared.map(|_| ())
}

/// Summary hook that reduces the run statistics to the throughput and latency artifacts.
pub fn write_summary_artifacts(
    ctx: &RunnerContext<PgRunnerContext>,
    summary: &RunSummary,
) -> HookResult {
    let results_dir = &ctx.get().config().results_dir;
    BenchmarkArtifacts::reduce(&summary.scenario_name, &summary.statistics)
        .write_to(results_dir, &summary.scenario_name)
        .with_context(|| {
            format!(
                "Failed to write benchmark artifacts for [{}]",
                summary.scenario_name
            )
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::context::PgAgentContext;
    use proxy_bench_runner::prelude::{
        run, AgentContext, BenchScenarioCli, ReporterOpt, ScenarioDefinitionBuilder,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    static CLOSED_AFTER_FAILED_SETUP: AtomicBool = AtomicBool::new(false);
    static OPEN_AFTER_SUCCESSFUL_SETUP: AtomicBool = AtomicBool::new(false);

    fn open_lazy_pool(ctx: &mut RunnerContext<PgRunnerContext>) -> HookResult {
        let options = ctx.get().config().connect_options();
        let reporter = ctx.reporter();
        // The pool starts its maintenance tasks on creation, which needs the runtime.
        let database = ctx.executor().execute_in_place(async move {
            Ok(BenchDatabase::lazy_pool(options, 0, 2, reporter))
        })?;

        ctx.get_mut().database = Some(database);
        Ok(())
    }

    fn idle(_ctx: &mut AgentContext<PgRunnerContext, PgAgentContext>) -> HookResult {
        std::thread::sleep(Duration::from_millis(1));
        Ok(())
    }

    fn scenario(name: &str) -> ScenarioDefinitionBuilder<PgRunnerContext, PgAgentContext> {
        ScenarioDefinitionBuilder::new(
            name,
            BenchScenarioCli {
                no_progress: true,
                reporter: ReporterOpt::Noop,
                run_id: None,
            },
        )
        .with_duration(Duration::from_millis(100))
        .with_runner_value(PgRunnerContext::new(RunConfig::default()))
        .use_agent_behaviour(idle)
    }

    #[test]
    fn failed_setup_closes_the_connection() {
        fn setup(ctx: &mut RunnerContext<PgRunnerContext>) -> HookResult {
            open_lazy_pool(ctx)?;
            let seeded: HookResult = Err(anyhow::anyhow!("Failed to seed"));
            let result = close_on_setup_error(ctx, seeded);

            CLOSED_AFTER_FAILED_SETUP.store(ctx.get().database()?.is_closed(), Ordering::SeqCst);
            result
        }

        let result = run(scenario("failed-setup").use_setup(setup));

        assert_eq!("Failed to seed", result.unwrap_err().to_string());
        assert!(CLOSED_AFTER_FAILED_SETUP.load(Ordering::SeqCst));
    }

    #[test]
    fn successful_setup_leaves_the_connection_open() {
        fn setup(ctx: &mut RunnerContext<PgRunnerContext>) -> HookResult {
            open_lazy_pool(ctx)?;
            close_on_setup_error(ctx, Ok(()))?;

            let open = !ctx.get().database()?.is_closed();
            OPEN_AFTER_SUCCESSFUL_SETUP.store(open, Ordering::SeqCst);
            Ok(())
        }

        let report = run(
            scenario("successful-setup")
                .use_setup(setup)
                .use_teardown(close_database),
        );

        assert!(report.is_ok());
        assert!(OPEN_AFTER_SUCCESSFUL_SETUP.load(Ordering::SeqCst));
    }
}
