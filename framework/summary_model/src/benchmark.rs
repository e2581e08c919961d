use crate::RunStatistics;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Unit for the throughput collection, which the dashboard treats as bigger-is-better.
pub const THROUGHPUT_UNIT: &str = "iter/s";
/// Unit for the latency collection, which the dashboard treats as smaller-is-better.
pub const LATENCY_UNIT: &str = "ms";

/// One data point in a benchmark artifact, in the format consumed by the benchmark dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkEntry {
    pub name: String,
    pub unit: String,
    pub value: f64,
}

impl BenchmarkEntry {
    fn new(name: String, unit: &str, value: f64) -> Self {
        Self {
            name,
            unit: unit.to_string(),
            value: round_to_hundredths(value),
        }
    }
}

/// The two fixed-shape collections emitted for every scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkArtifacts {
    /// Bigger-is-better: `<scenario>_rate`
    pub throughput: Vec<BenchmarkEntry>,
    /// Smaller-is-better: `<scenario>_p95` and `<scenario>_p99`
    pub latency: Vec<BenchmarkEntry>,
}

impl BenchmarkArtifacts {
    /// Project the run statistics onto the throughput and latency collections.
    ///
    /// This only reads the pre-computed rate and percentiles and rounds them to two decimal
    /// places, so the same statistics always produce the same artifacts.
    pub fn reduce(scenario_name: &str, statistics: &RunStatistics) -> Self {
        Self {
            throughput: vec![BenchmarkEntry::new(
                format!("{scenario_name}_rate"),
                THROUGHPUT_UNIT,
                statistics.iterations.rate,
            )],
            latency: vec![
                BenchmarkEntry::new(
                    format!("{scenario_name}_p95"),
                    LATENCY_UNIT,
                    statistics.iteration_duration.p95,
                ),
                BenchmarkEntry::new(
                    format!("{scenario_name}_p99"),
                    LATENCY_UNIT,
                    statistics.iteration_duration.p99,
                ),
            ],
        }
    }

    pub fn throughput_path(results_dir: &Path, scenario_name: &str) -> PathBuf {
        results_dir.join(format!("{scenario_name}-throughput.json"))
    }

    pub fn latency_path(results_dir: &Path, scenario_name: &str) -> PathBuf {
        results_dir.join(format!("{scenario_name}-latency.json"))
    }

    /// Write both collections to `results_dir`, creating the directory if needed.
    ///
    /// Existing artifacts for the same scenario are replaced. Returns the paths written, throughput
    /// first.
    pub fn write_to(&self, results_dir: &Path, scenario_name: &str) -> anyhow::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(results_dir).with_context(|| {
            format!("Failed to create results directory {}", results_dir.display())
        })?;

        let throughput_path = Self::throughput_path(results_dir, scenario_name);
        write_entries(&throughput_path, &self.throughput)?;

        let latency_path = Self::latency_path(results_dir, scenario_name);
        write_entries(&latency_path, &self.latency)?;

        log::info!(
            "Wrote benchmark artifacts {} and {}",
            throughput_path.display(),
            latency_path.display()
        );

        Ok(vec![throughput_path, latency_path])
    }
}

fn write_entries(path: &Path, entries: &[BenchmarkEntry]) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create artifact {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, entries)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Round to two decimal places so that artifacts diff cleanly between runs.
///
/// Non-finite values are reported as `0.0` because the artifact format has no representation
/// for them.
pub fn round_to_hundredths(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}
