use std::sync::Arc;
use std::time::Duration;

use proxy_bench_runner::prelude::{
    run, AbortRunError, AgentContext, BenchScenarioCli, HookResult, ReporterOpt, RunnerContext,
    ScenarioDefinitionBuilder, UserValuesConstraint,
};

#[derive(Default, Debug)]
struct RunnerContextValue {}

impl UserValuesConstraint for RunnerContextValue {}

#[derive(Default, Debug)]
struct AgentContextValue {
    value: i32,
}

impl UserValuesConstraint for AgentContextValue {}

fn sample_cli_cfg() -> BenchScenarioCli {
    BenchScenarioCli {
        no_progress: true,
        reporter: ReporterOpt::Noop,
        run_id: None,
    }
}

fn succeed(_ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>) -> HookResult {
    std::thread::sleep(Duration::from_millis(1));
    Ok(())
}

#[test]
fn propagate_error_in_setup_hook() {
    fn setup(_ctx: &mut RunnerContext<RunnerContextValue>) -> HookResult {
        Err(anyhow::anyhow!("Error in setup hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "propagate_error_in_setup_hook",
        sample_cli_cfg(),
    )
    .with_duration(Duration::from_secs(5))
    .use_setup(setup)
    .use_agent_behaviour(succeed);

    let result = run(scenario);

    assert!(result.is_err());
    assert_eq!(result.unwrap_err().to_string(), "Error in setup hook");
}

#[test]
fn missing_behaviour_is_rejected() {
    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "missing_behaviour_is_rejected",
        sample_cli_cfg(),
    );

    assert!(run(scenario).is_err());
}

#[test]
fn capture_error_in_agent_behaviour_and_continue() {
    fn agent_behaviour(
        ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        if ctx.get().value < 5 {
            ctx.get_mut().value += 1;
        } else {
            // Save time running this test by shutting down once this has run a few times.
            ctx.runner_context().force_stop_scenario();
        }

        Err(anyhow::anyhow!("Error in agent behaviour hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "capture_error_in_agent_behaviour_and_continue",
        sample_cli_cfg(),
    )
    .with_duration(Duration::from_secs(5))
    .use_agent_behaviour(agent_behaviour);

    let report = run(scenario).unwrap();

    let iterations = &report.summary().statistics.iterations;
    assert_eq!(0, iterations.count);
    assert!(iterations.failed >= 6, "failed was {}", iterations.failed);
    assert!(report.ensure_thresholds().is_ok());
}

#[test]
fn abort_error_stops_the_run() {
    fn agent_behaviour(
        _ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>,
    ) -> HookResult {
        Err(AbortRunError::new("connection refused").into())
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "abort_error_stops_the_run",
        sample_cli_cfg(),
    )
    .with_vus(2)
    .with_duration(Duration::from_secs(30))
    .use_agent_behaviour(agent_behaviour);

    let started = std::time::Instant::now();
    let result = run(scenario);

    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("connection refused"));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn error_in_teardown_is_fatal() {
    fn teardown(_ctx: Arc<RunnerContext<RunnerContextValue>>) -> HookResult {
        Err(anyhow::anyhow!("Error in teardown hook"))
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "error_in_teardown_is_fatal",
        sample_cli_cfg(),
    )
    .with_duration(Duration::from_millis(200))
    .use_agent_behaviour(succeed)
    .use_teardown(teardown);

    let result = run(scenario);

    assert!(result.is_err());
    assert_eq!(
        "Error in teardown hook",
        result.unwrap_err().root_cause().to_string()
    );
}

#[test]
fn crossed_threshold_fails_the_report() {
    fn slow(_ctx: &mut AgentContext<RunnerContextValue, AgentContextValue>) -> HookResult {
        std::thread::sleep(Duration::from_millis(20));
        Ok(())
    }

    let scenario = ScenarioDefinitionBuilder::<RunnerContextValue, AgentContextValue>::new(
        "crossed_threshold_fails_the_report",
        sample_cli_cfg(),
    )
    .with_duration(Duration::from_millis(300))
    .with_p95_threshold(Duration::from_millis(5))
    .use_agent_behaviour(slow);

    let report = run(scenario).unwrap();

    assert!(!report.summary().thresholds_passed());
    assert!(report.ensure_thresholds().is_err());
}
