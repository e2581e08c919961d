mod cli;
mod context;
mod definition;
mod executor;
mod init;
mod monitor;
mod progress;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::cli::{BenchScenarioCli, ReporterOpt};
    pub use crate::context::{AgentContext, RunnerContext, UserValuesConstraint};
    pub use crate::definition::{HookResult, ScenarioDefinitionBuilder};
    pub use crate::executor::Executor;
    pub use crate::init::init;
    pub use crate::run::{run, RunReport};
    pub use crate::types::BenchResult;

    pub use proxy_bench_core::prelude::*;
    pub use proxy_bench_instruments::{report_operation, OperationRecord, Reporter};
    pub use proxy_bench_summary_model::{RunStatistics, RunSummary};
}
