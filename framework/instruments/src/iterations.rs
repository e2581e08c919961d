use anyhow::Context;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use proxy_bench_summary_model::{DurationDistribution, IterationCounts, RunStatistics};
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Highest trackable iteration duration, in microseconds. Longer samples are clamped.
const MAX_TRACKABLE_MICROS: u64 = 60 * 60 * 1_000_000;

/// Records the duration of every iteration run by the virtual users and reduces them to
/// [RunStatistics] at the end of the run.
///
/// Durations are kept in an HDR histogram with three significant figures, so memory use is
/// fixed no matter how many iterations are recorded.
pub struct IterationRecorder {
    inner: Mutex<IterationState>,
}

struct IterationState {
    histogram: Histogram<u64>,
    failed: u64,
}

impl IterationRecorder {
    pub fn new() -> anyhow::Result<Self> {
        let histogram = Histogram::new_with_bounds(1, MAX_TRACKABLE_MICROS, 3)
            .context("Failed to create iteration duration histogram")?;

        Ok(Self {
            inner: Mutex::new(IterationState {
                histogram,
                failed: 0,
            }),
        })
    }

    pub fn record_success(&self, duration: Duration) {
        let micros = (duration.as_micros() as u64).max(1);
        self.inner.lock().histogram.saturating_record(micros);
    }

    pub fn record_failure(&self) {
        self.inner.lock().failed += 1;
    }

    /// Reduce the recorded samples. `elapsed` is the wall-clock length of the load phase and is
    /// used to compute the iteration rate.
    pub fn statistics(&self, elapsed: Duration) -> RunStatistics {
        let state = self.inner.lock();
        let histogram = &state.histogram;
        let count = histogram.len();

        let rate = if elapsed.is_zero() {
            0.0
        } else {
            count as f64 / elapsed.as_secs_f64()
        };

        let iteration_duration = if count == 0 {
            DurationDistribution::default()
        } else {
            DurationDistribution {
                avg: histogram.mean() / 1000.0,
                min: micros_to_millis(histogram.min()),
                med: micros_to_millis(histogram.value_at_quantile(0.5)),
                max: micros_to_millis(histogram.max()),
                p90: micros_to_millis(histogram.value_at_quantile(0.90)),
                p95: micros_to_millis(histogram.value_at_quantile(0.95)),
                p99: micros_to_millis(histogram.value_at_quantile(0.99)),
            }
        };

        RunStatistics {
            iterations: IterationCounts {
                count,
                failed: state.failed,
                rate,
            },
            iteration_duration,
        }
    }
}

fn micros_to_millis(micros: u64) -> f64 {
    micros as f64 / 1000.0
}

#[derive(Tabled)]
struct IterationRow {
    iterations: u64,
    failed: u64,
    #[tabled(display = "per_second")]
    rate: f64,
    #[tabled(display = "millis")]
    avg: f64,
    #[tabled(display = "millis")]
    min: f64,
    #[tabled(display = "millis")]
    med: f64,
    #[tabled(display = "millis")]
    max: f64,
    #[tabled(rename = "p(90)", display = "millis")]
    p90: f64,
    #[tabled(rename = "p(95)", display = "millis")]
    p95: f64,
    #[tabled(rename = "p(99)", display = "millis")]
    p99: f64,
}

fn per_second(n: &f64) -> String {
    format!("{n:.2}/s")
}

fn millis(n: &f64) -> String {
    format!("{n:.2}ms")
}

/// Print the iteration statistics for the run as a table.
pub fn print_iteration_summary(statistics: &RunStatistics) {
    let duration = &statistics.iteration_duration;
    let row = IterationRow {
        iterations: statistics.iterations.count,
        failed: statistics.iterations.failed,
        rate: statistics.iterations.rate,
        avg: duration.avg,
        min: duration.min,
        med: duration.med,
        max: duration.max,
        p90: duration.p90,
        p95: duration.p95,
        p99: duration.p99,
    };

    println!("\nSummary of iterations");
    let mut table = Table::new([row]);
    table.with(Style::modern());

    println!("{table}");
}
