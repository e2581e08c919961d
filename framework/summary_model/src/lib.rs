mod benchmark;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use benchmark::{
    round_to_hundredths, BenchmarkArtifacts, BenchmarkEntry, LATENCY_UNIT, THROUGHPUT_UNIT,
};

/// Aggregate statistics for the iterations of a run.
///
/// These are computed by the runner once all virtual users have stopped. Nothing in this crate
/// computes statistics, it only reads these pre-computed values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunStatistics {
    pub iterations: IterationCounts,
    /// Distribution of successful iteration durations, in milliseconds.
    pub iteration_duration: DurationDistribution,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IterationCounts {
    /// The number of iterations that completed successfully
    pub count: u64,
    /// The number of iterations that returned an error
    ///
    /// Failed iterations are not included in [IterationCounts::count], [IterationCounts::rate] or
    /// the duration distribution.
    pub failed: u64,
    /// Successful iterations per second over the load phase of the run
    pub rate: f64,
}

impl IterationCounts {
    /// Fraction of all iterations that failed, in the range `0.0..=1.0`.
    pub fn failure_rate(&self) -> f64 {
        let total = self.count + self.failed;
        if total == 0 {
            0.0
        } else {
            self.failed as f64 / total as f64
        }
    }
}

/// Duration distribution in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DurationDistribution {
    pub avg: f64,
    pub min: f64,
    pub med: f64,
    pub max: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// The result of checking one threshold at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdOutcome {
    /// Human readable description, for example `iteration_duration p(95)<200ms`
    pub name: String,
    pub limit_ms: f64,
    pub observed_ms: f64,
    pub passed: bool,
}

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner unless provided on the command line.
    pub run_id: String,
    /// The name of the scenario that was run
    pub scenario_name: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The load duration that the run was configured with, in milliseconds
    pub run_duration_ms: u64,
    /// The number of virtual users configured
    pub vus: usize,
    /// The number of virtual users still running at the end of the run
    ///
    /// This is less than [RunSummary::vus] if a virtual user exited early, for example because
    /// its thread panicked.
    pub vus_end_count: usize,
    pub statistics: RunStatistics,
    pub thresholds: Vec<ThresholdOutcome>,
    /// Selected configuration values for the run
    ///
    /// This won't capture all environment variables. Just the ones that the scenario chose to
    /// record, such as the benchmark target.
    pub env: HashMap<String, String>,
    /// The version of the harness that produced this summary
    pub harness_version: String,
}

impl RunSummary {
    pub fn new(
        run_id: String,
        scenario_name: String,
        started_at: i64,
        run_duration_ms: u64,
        vus: usize,
        harness_version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            started_at,
            run_duration_ms,
            vus,
            vus_end_count: 0,
            statistics: RunStatistics::default(),
            thresholds: Vec::with_capacity(0),
            env: HashMap::with_capacity(0),
            harness_version,
        }
    }

    pub fn set_vus_end_count(&mut self, vus_end_count: usize) {
        self.vus_end_count = vus_end_count;
    }

    pub fn set_statistics(&mut self, statistics: RunStatistics) {
        self.statistics = statistics;
    }

    pub fn add_threshold_outcome(&mut self, outcome: ThresholdOutcome) {
        self.thresholds.push(outcome);
    }

    pub fn add_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }
}
