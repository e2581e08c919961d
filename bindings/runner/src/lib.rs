mod common;
mod config;
mod context;
mod data;
mod definition;

pub mod prelude {
    /// Common operations for PostgreSQL scenarios.
    ///
    /// This is a good place to start if you are getting started writing scenarios.
    pub use crate::common::*;

    pub use crate::config::{ConfigError, PayloadMode, RunConfig, Target};
    pub use crate::context::{PgAgentContext, PgRunnerContext};
    pub use crate::data::*;
    pub use crate::definition::PgScenarioDefinitionBuilder;

    /// Re-export of the `proxy_bench_runner` prelude.
    ///
    /// This is for convenience so that you can depend on a single crate for the runner in your scenarios.
    pub use proxy_bench_runner::prelude::*;

    /// Re-export of the instrumented client for convenience.
    pub use postgres_client_instrumented::prelude::*;
}
