mod database;
mod error;

pub mod prelude {
    pub use crate::database::{BenchDatabase, ConnectionKind, ExecuteOutcome, SqlParam};
    pub use crate::error::handle_sqlx_err;

    // Connection options are built by the runner bindings, so re-export them to avoid depending on
    // both this wrapper and the driver crate.
    pub use sqlx::postgres::{PgConnectOptions, PgSslMode};
}
