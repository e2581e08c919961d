mod in_memory_reporter;

use crate::OperationRecord;
use parking_lot::Mutex;

pub use in_memory_reporter::InMemoryReporter;

pub trait ReportCollector {
    fn add_operation(&mut self, operation_record: &OperationRecord);

    fn finalize(&self);
}

/// Fans operation records out to the configured collectors.
///
/// The reporter is shared between all virtual users, so each collector sits behind its own lock.
pub struct Reporter {
    collectors: Vec<Mutex<Box<dyn ReportCollector + Send>>>,
}

impl Reporter {
    pub fn add_operation(&self, operation_record: &OperationRecord) {
        for collector in &self.collectors {
            collector.lock().add_operation(operation_record);
        }
    }

    pub fn finalize(&self) {
        for collector in &self.collectors {
            collector.lock().finalize();
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("collectors", &self.collectors.len())
            .finish()
    }
}

#[derive(Default)]
pub struct ReportConfig {
    enable_in_memory: bool,
}

impl ReportConfig {
    /// Keep per-operation aggregates in memory and print them as a table at the end of the run.
    pub fn enable_in_memory(mut self) -> Self {
        self.enable_in_memory = true;
        self
    }

    pub fn init(self) -> Reporter {
        let mut collectors: Vec<Mutex<Box<dyn ReportCollector + Send>>> = Vec::new();
        if self.enable_in_memory {
            collectors.push(Mutex::new(Box::new(InMemoryReporter::new())));
        }

        Reporter { collectors }
    }
}
