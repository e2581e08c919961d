use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use parking_lot::Mutex;
use proxy_bench_core::prelude::AbortRunError;
use proxy_bench_instruments::{print_iteration_summary, IterationRecorder, ReportConfig};
use proxy_bench_summary_model::{RunStatistics, RunSummary, ThresholdOutcome};

use crate::cli::ReporterOpt;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::{
    context::{AgentContext, RunnerContext, UserValuesConstraint},
    definition::ScenarioDefinitionBuilder,
    executor::Executor,
    shutdown::start_shutdown_listener,
};

/// The outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    summary: RunSummary,
}

impl RunReport {
    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Turn crossed thresholds into an error so that the scenario binary exits non-zero.
    ///
    /// Call this after the summary hook has written the artifacts.
    pub fn ensure_thresholds(&self) -> anyhow::Result<()> {
        let crossed = self
            .summary
            .thresholds
            .iter()
            .filter(|t| !t.passed)
            .map(|t| format!("{} (observed {:.2}ms)", t.name, t.observed_ms))
            .collect::<Vec<_>>();

        if crossed.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Scenario [{}] crossed its thresholds: {}",
                self.summary.scenario_name,
                crossed.join(", ")
            )
        }
    }
}

/// Run a scenario to completion.
///
/// Setup runs once, then the configured number of virtual users run the behaviour in a loop until
/// the duration elapses. Teardown runs once after every virtual user has stopped, then the
/// statistics are computed and passed to the summary hook.
///
/// An iteration that returns an error is recorded as failed and the virtual user carries on, unless
/// the error is an [AbortRunError], which stops the whole run. Errors from setup, teardown or the
/// summary hook are returned.
pub fn run<RV: UserValuesConstraint, AV: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, AV>,
) -> anyhow::Result<RunReport> {
    let definition = definition.build()?;

    log::info!(
        "Running scenario [{}] with {} virtual users for {:?}",
        definition.name,
        definition.vus,
        definition.duration
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);
    let executor = Arc::new(Executor::new(runtime));

    let reporter = Arc::new(match definition.reporter {
        ReporterOpt::Noop => ReportConfig::default().init(),
        ReporterOpt::InMemory => ReportConfig::default().enable_in_memory().init(),
    });

    let run_id = definition
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!());
    let started_at = chrono::Utc::now().timestamp();

    let mut runner_context = RunnerContext::new(
        executor,
        reporter.clone(),
        shutdown_handle.clone(),
        run_id.clone(),
        definition.runner_value,
    );

    if let Some(setup_fn) = definition.setup_fn {
        setup_fn(&mut runner_context)?;
        log::info!("Setup complete for scenario [{}]", definition.name);
    }

    let runner_context = Arc::new(runner_context);
    let recorder = Arc::new(IterationRecorder::new()?);
    let aborted: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let load_started = Instant::now();

    // Stop starting new iterations once the duration has elapsed.
    {
        let shutdown_handle = shutdown_handle.clone();
        let duration = definition.duration;
        runner_context.executor().spawn(async move {
            tokio::time::sleep(duration).await;
            log::debug!("Run duration elapsed");
            shutdown_handle.shutdown();
        });
    }

    if !definition.no_progress {
        start_progress(definition.duration, shutdown_handle.new_listener())?;
    }
    start_monitor(shutdown_handle.new_listener())?;

    let mut handles = Vec::with_capacity(definition.vus);
    for agent_index in 0..definition.vus {
        let runner_context = runner_context.clone();
        let recorder = recorder.clone();
        let aborted = aborted.clone();
        let behaviour = definition.agent_behaviour;
        let abort_handle = shutdown_handle.clone();

        // For us to check if the virtual user should stop between iterations
        let mut cycle_shutdown_listener = shutdown_handle.new_listener();
        // For the behaviour implementation to listen for shutdown and respond appropriately
        let delegated_shutdown_listener = shutdown_handle.new_listener();

        let agent_name = format!("vu-{agent_index}");

        let spawned = std::thread::Builder::new()
            .name(agent_name.clone())
            .spawn(move || {
                let mut context = AgentContext::<RV, AV>::new(
                    agent_index,
                    agent_name.clone(),
                    runner_context,
                    delegated_shutdown_listener,
                );

                log::debug!("Starting virtual user {agent_name}");
                loop {
                    if cycle_shutdown_listener.should_shutdown() {
                        log::debug!("Stopping virtual user {agent_name}");
                        break;
                    }

                    let iteration_started = Instant::now();
                    match behaviour(&mut context) {
                        Ok(()) => recorder.record_success(iteration_started.elapsed()),
                        Err(e) if e.is::<AbortRunError>() => {
                            recorder.record_failure();
                            log::error!("Virtual user {agent_name} aborted the run: {e:?}");
                            aborted.lock().get_or_insert_with(|| format!("{e:#}"));
                            abort_handle.shutdown();
                            break;
                        }
                        Err(e) => {
                            recorder.record_failure();
                            log::debug!("Iteration failed for virtual user {agent_name}: {e:?}");
                        }
                    }
                }
            });

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                shutdown_handle.shutdown();
                return Err(e).context("Failed to spawn thread for virtual user");
            }
        }
    }

    let mut vus_end_count = 0;
    for handle in handles {
        match handle.join() {
            Ok(()) => vus_end_count += 1,
            Err(e) => log::error!("Virtual user thread panicked: {e:?}"),
        }
    }
    let load_elapsed = load_started.elapsed();

    // Also stops the progress and monitor threads when the run ended early.
    shutdown_handle.shutdown();

    if let Some(teardown_fn) = definition.teardown_fn {
        teardown_fn(runner_context.clone())
            .with_context(|| format!("Teardown failed for scenario [{}]", definition.name))?;
        log::info!("Teardown complete for scenario [{}]", definition.name);
    }

    if let Some(reason) = aborted.lock().take() {
        anyhow::bail!("Scenario [{}] was aborted: {reason}", definition.name);
    }

    let statistics = recorder.statistics(load_elapsed);

    let failure_rate = statistics.iterations.failure_rate();
    if failure_rate > 0.0 {
        log::warn!(
            "{} of {} iterations failed ({:.2}%)",
            statistics.iterations.failed,
            statistics.iterations.count + statistics.iterations.failed,
            failure_rate * 100.0
        );
    }

    let mut summary = RunSummary::new(
        run_id,
        definition.name.clone(),
        started_at,
        definition.duration.as_millis() as u64,
        definition.vus,
        env!("CARGO_PKG_VERSION").to_string(),
    );
    summary.set_vus_end_count(vus_end_count);
    for (key, value) in definition.env {
        summary.add_env(key, value);
    }
    if let Some(threshold) = definition.p95_threshold {
        summary.add_threshold_outcome(p95_outcome(threshold, &statistics));
    }
    summary.set_statistics(statistics);

    print_iteration_summary(&summary.statistics);
    reporter.finalize();

    for outcome in &summary.thresholds {
        if outcome.passed {
            log::info!("Threshold passed: {}", outcome.name);
        } else {
            log::error!(
                "Threshold crossed: {} (observed {:.2}ms)",
                outcome.name,
                outcome.observed_ms
            );
        }
    }

    if let Some(summary_fn) = definition.summary_fn {
        summary_fn(&runner_context, &summary).with_context(|| {
            format!("Summary hook failed for scenario [{}]", definition.name)
        })?;
    }

    Ok(RunReport { summary })
}

/// A run without a single successful iteration has no latency to compare, so it never passes.
fn p95_outcome(threshold: Duration, statistics: &RunStatistics) -> ThresholdOutcome {
    let limit_ms = threshold.as_secs_f64() * 1000.0;
    let observed_ms = statistics.iteration_duration.p95;

    ThresholdOutcome {
        name: format!("iteration_duration p(95)<{limit_ms}ms"),
        limit_ms,
        observed_ms,
        passed: statistics.iterations.count > 0 && observed_ms < limit_ms,
    }
}
