mod iterations;
mod report;

use std::time::{Duration, Instant};

pub use iterations::{print_iteration_summary, IterationRecorder};
pub use report::{ReportCollector, ReportConfig, Reporter};

/// A single timed operation, such as one statement executed against the system under test.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub operation_id: String,
    started: Instant,
    elapsed: Option<Duration>,
    is_error: bool,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started: Instant::now(),
            elapsed: None,
            is_error: false,
        }
    }

    /// Stop the clock and record whether the operation failed.
    pub fn finish<T, E>(&mut self, response: &Result<T, E>) {
        self.elapsed = Some(self.started.elapsed());
        self.is_error = response.is_err();
    }

    /// The measured duration, available once [OperationRecord::finish] has been called.
    pub fn duration(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

/// Finish the operation record with the given response and pass it to the reporter.
pub fn report_operation<T, E>(
    reporter: &Reporter,
    mut operation_record: OperationRecord,
    response: &Result<T, E>,
) {
    operation_record.finish(response);
    reporter.add_operation(&operation_record);
}
