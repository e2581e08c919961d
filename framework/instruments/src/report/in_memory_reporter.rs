mod operations_table;

use crate::report::in_memory_reporter::operations_table::OperationRow;
use crate::report::ReportCollector;
use crate::OperationRecord;
use std::collections::BTreeMap;
use std::time::Duration;
use tabled::settings::Style;
use tabled::Table;

#[derive(Default)]
struct OperationAggregate {
    total_operations: u64,
    failed_operations: u64,
    total_duration: Duration,
    min_success: Option<Duration>,
    max_success: Option<Duration>,
}

/// Keeps running aggregates for each operation id and prints them as a table at the end of the
/// run.
///
/// Only aggregates are kept so memory use does not grow with the length of the run.
pub struct InMemoryReporter {
    operations: BTreeMap<String, OperationAggregate>,
}

impl InMemoryReporter {
    pub fn new() -> Self {
        Self {
            operations: BTreeMap::new(),
        }
    }

    fn rows(&self) -> Vec<OperationRow> {
        self.operations
            .iter()
            .map(|(operation_id, aggregate)| {
                let total_duration_ms = aggregate.total_duration.as_micros() as f64 / 1000.0;
                OperationRow {
                    operation_id: operation_id.clone(),
                    avg_time_ms: total_duration_ms / aggregate.total_operations.max(1) as f64,
                    min_time_ms: aggregate.min_success.map(as_millis_f64),
                    max_time_ms: aggregate.max_success.map(as_millis_f64),
                    total_operations: aggregate.total_operations,
                    failed_operations: aggregate.failed_operations,
                    total_duration_ms,
                }
            })
            .collect()
    }

    pub(crate) fn print_summary_of_operations(&self) {
        if self.operations.is_empty() {
            return;
        }

        println!("\nSummary of operations");
        let mut table = Table::new(self.rows());
        table.with(Style::modern());

        println!("{table}");
    }
}

impl Default for InMemoryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportCollector for InMemoryReporter {
    fn add_operation(&mut self, operation_record: &OperationRecord) {
        let Some(elapsed) = operation_record.duration() else {
            log::warn!(
                "Operation {} was reported before it finished",
                operation_record.operation_id
            );
            return;
        };

        let aggregate = self
            .operations
            .entry(operation_record.operation_id.clone())
            .or_default();
        aggregate.total_operations += 1;
        aggregate.total_duration += elapsed;

        if operation_record.is_error() {
            aggregate.failed_operations += 1;
        } else {
            aggregate.min_success = Some(aggregate.min_success.map_or(elapsed, |m| m.min(elapsed)));
            aggregate.max_success = Some(aggregate.max_success.map_or(elapsed, |m| m.max(elapsed)));
        }
    }

    fn finalize(&self) {
        self.print_summary_of_operations();
    }
}

fn as_millis_f64(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}
