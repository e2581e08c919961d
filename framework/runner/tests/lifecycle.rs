use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proxy_bench_runner::prelude::{
    run, AgentContext, BenchScenarioCli, HookResult, ReporterOpt, RunSummary, RunnerContext,
    ScenarioDefinitionBuilder, UserValuesConstraint,
};
use proxy_bench_summary_model::BenchmarkArtifacts;

#[derive(Default, Debug)]
struct LifecycleRunnerValue {
    results_dir: std::path::PathBuf,
    setup_done: AtomicBool,
    teardown_done: AtomicBool,
    iterations_before_setup: AtomicUsize,
    iterations_after_teardown: AtomicUsize,
    teardown_calls: AtomicUsize,
}

impl UserValuesConstraint for LifecycleRunnerValue {}

#[derive(Default, Debug)]
struct LifecycleAgentValue {}

impl UserValuesConstraint for LifecycleAgentValue {}

fn setup(ctx: &mut RunnerContext<LifecycleRunnerValue>) -> HookResult {
    ctx.get().setup_done.store(true, Ordering::SeqCst);
    Ok(())
}

fn agent_behaviour(ctx: &mut AgentContext<LifecycleRunnerValue, LifecycleAgentValue>) -> HookResult {
    let value = ctx.runner_context().get();
    if !value.setup_done.load(Ordering::SeqCst) {
        value.iterations_before_setup.fetch_add(1, Ordering::SeqCst);
    }
    if value.teardown_done.load(Ordering::SeqCst) {
        value.iterations_after_teardown.fetch_add(1, Ordering::SeqCst);
    }

    // A fake statement, executed through the shared runtime like a real one.
    ctx.runner_context().executor().execute_in_place(async {
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(())
    })
}

fn teardown(ctx: Arc<RunnerContext<LifecycleRunnerValue>>) -> HookResult {
    let value = ctx.get();
    value.teardown_calls.fetch_add(1, Ordering::SeqCst);
    value.teardown_done.store(true, Ordering::SeqCst);
    Ok(())
}

fn write_summary(ctx: &RunnerContext<LifecycleRunnerValue>, summary: &RunSummary) -> HookResult {
    let value = ctx.get();
    assert!(value.teardown_done.load(Ordering::SeqCst));
    assert_eq!(0, value.iterations_before_setup.load(Ordering::SeqCst));
    assert_eq!(0, value.iterations_after_teardown.load(Ordering::SeqCst));

    BenchmarkArtifacts::reduce(&summary.scenario_name, &summary.statistics)
        .write_to(&value.results_dir, &summary.scenario_name)?;
    Ok(())
}

#[test]
fn full_lifecycle_writes_two_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let results_dir = dir.path().join("bench");

    let scenario = ScenarioDefinitionBuilder::<LifecycleRunnerValue, LifecycleAgentValue>::new(
        "lifecycle",
        BenchScenarioCli {
            no_progress: true,
            reporter: ReporterOpt::InMemory,
            run_id: Some("lifecycle-run".to_string()),
        },
    )
    .with_vus(10)
    .with_duration(Duration::from_secs(1))
    .with_p95_threshold(Duration::from_secs(30))
    .with_runner_value(LifecycleRunnerValue {
        results_dir: results_dir.clone(),
        ..Default::default()
    })
    .add_env("BENCH_TARGET", "proxy")
    .use_setup(setup)
    .use_agent_behaviour(agent_behaviour)
    .use_teardown(teardown)
    .use_summary(write_summary);

    let report = run(scenario).unwrap();
    report.ensure_thresholds().unwrap();

    let summary = report.summary();
    assert_eq!("lifecycle-run", summary.run_id);
    assert_eq!("lifecycle", summary.scenario_name);
    assert_eq!(10, summary.vus);
    assert_eq!(10, summary.vus_end_count);
    assert_eq!(Some(&"proxy".to_string()), summary.env.get("BENCH_TARGET"));
    assert!(summary.statistics.iterations.count > 0);
    assert_eq!(0, summary.statistics.iterations.failed);
    assert!(summary.statistics.iterations.rate > 0.0);

    let mut written = std::fs::read_dir(&results_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect::<Vec<_>>();
    written.sort();
    assert_eq!(
        vec![
            "lifecycle-latency.json".to_string(),
            "lifecycle-throughput.json".to_string()
        ],
        written
    );
}

static TEARDOWN_CALLS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn teardown_runs_once_after_early_stop() {
    #[derive(Default, Debug)]
    struct Unit;
    impl UserValuesConstraint for Unit {}

    fn stop_immediately(ctx: &mut AgentContext<Unit, Unit>) -> HookResult {
        ctx.runner_context().force_stop_scenario();
        Ok(())
    }

    fn count_teardown(_ctx: Arc<RunnerContext<Unit>>) -> HookResult {
        TEARDOWN_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    let scenario = ScenarioDefinitionBuilder::<Unit, Unit>::new(
        "teardown_runs_once_after_early_stop",
        BenchScenarioCli {
            no_progress: true,
            reporter: ReporterOpt::Noop,
            run_id: None,
        },
    )
    .with_vus(4)
    .with_duration(Duration::from_secs(30))
    .use_agent_behaviour(stop_immediately)
    .use_teardown(count_teardown);

    let report = run(scenario).unwrap();

    assert_eq!(1, TEARDOWN_CALLS.load(Ordering::SeqCst));
    assert!(report.summary().statistics.iterations.count >= 1);
}
