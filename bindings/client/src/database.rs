use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use proxy_bench_instruments::Reporter;
use proxy_bench_instruments_derive::bench_instrument;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{Connection, Postgres};
use tokio::sync::Mutex;

use crate::error::handle_sqlx_err;

/// A statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i32),
    Text(String),
    /// Bound as `jsonb`
    Json(serde_json::Value),
}

impl From<i32> for SqlParam {
    fn from(value: i32) -> Self {
        SqlParam::Int(value)
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<serde_json::Value> for SqlParam {
    fn from(value: serde_json::Value) -> Self {
        SqlParam::Json(value)
    }
}

/// What `execute` reports back. Result rows are always discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOutcome {
    pub rows_affected: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// Bounded pool, shared by every virtual user
    Pool,
    /// One session, statements are serialized
    Single,
}

enum Handle {
    Pool(PgPool),
    Single(Mutex<Option<PgConnection>>),
}

/// A connection to the benchmark target, either a pool or a single session.
///
/// Every call to [BenchDatabase::execute] is timed and reported as a `pg_execute` operation.
pub struct BenchDatabase {
    handle: Handle,
    closed: AtomicBool,
    reporter: Arc<Reporter>,
}

impl std::fmt::Debug for BenchDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchDatabase")
            .field("kind", &self.kind())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl BenchDatabase {
    /// Open a pool and wait for its first connection.
    pub async fn connect_pool(
        options: PgConnectOptions,
        min_connections: u32,
        max_connections: u32,
        reporter: Arc<Reporter>,
    ) -> anyhow::Result<Self> {
        let pool = pool_options(min_connections, max_connections)
            .connect_with(options)
            .await
            .context("Failed to open connection pool")?;

        Ok(Self::new(Handle::Pool(pool), reporter))
    }

    /// Create a pool that only connects when the first statement is executed.
    pub fn lazy_pool(
        options: PgConnectOptions,
        min_connections: u32,
        max_connections: u32,
        reporter: Arc<Reporter>,
    ) -> Self {
        let pool = pool_options(min_connections, max_connections).connect_lazy_with(options);

        Self::new(Handle::Pool(pool), reporter)
    }

    /// Open a single session. Statements from concurrent callers are run one at a time.
    pub async fn connect_single(
        options: PgConnectOptions,
        reporter: Arc<Reporter>,
    ) -> anyhow::Result<Self> {
        let connection = PgConnection::connect_with(&options)
            .await
            .context("Failed to open database connection")?;

        Ok(Self::new(Handle::Single(Mutex::new(Some(connection))), reporter))
    }

    fn new(handle: Handle, reporter: Arc<Reporter>) -> Self {
        Self {
            handle,
            closed: AtomicBool::new(false),
            reporter,
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        match self.handle {
            Handle::Pool(_) => ConnectionKind::Pool,
            Handle::Single(_) => ConnectionKind::Single,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Execute a parameterized statement and discard any rows it returns.
    #[bench_instrument(prefix = "pg_")]
    pub async fn execute(
        &self,
        statement: &str,
        params: &[SqlParam],
    ) -> anyhow::Result<ExecuteOutcome> {
        if self.is_closed() {
            bail!("Cannot execute statement, the database handle is closed");
        }

        let query = bind_params(sqlx::query(statement), params);
        let result = match &self.handle {
            Handle::Pool(pool) => query.execute(pool).await,
            Handle::Single(connection) => {
                let mut guard = connection.lock().await;
                let Some(connection) = guard.as_mut() else {
                    bail!("Cannot execute statement, the database connection is closed");
                };
                query.execute(connection).await
            }
        }
        .map_err(handle_sqlx_err)?;

        Ok(ExecuteOutcome {
            rows_affected: result.rows_affected(),
        })
    }

    /// Release the pool or session.
    ///
    /// Only the first call closes anything and returns `true`. Later calls are no-ops that return
    /// `false`.
    pub async fn close(&self) -> anyhow::Result<bool> {
        if self.closed.swap(true, Ordering::AcqRel) {
            log::debug!("Database handle already closed");
            return Ok(false);
        }

        match &self.handle {
            Handle::Pool(pool) => pool.close().await,
            Handle::Single(connection) => {
                if let Some(connection) = connection.lock().await.take() {
                    connection
                        .close()
                        .await
                        .context("Failed to close database connection")?;
                }
            }
        }

        log::debug!("Closed database handle ({:?})", self.kind());
        Ok(true)
    }
}

fn pool_options(min_connections: u32, max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(max_connections)
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlParam::Int(value) => query.bind(*value),
            SqlParam::Text(value) => query.bind(value.as_str()),
            SqlParam::Json(value) => query.bind(sqlx::types::Json(value)),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_bench_instruments::ReportConfig;

    fn lazy_database() -> BenchDatabase {
        let options = PgConnectOptions::new()
            .host("127.0.0.1")
            .port(6432)
            .username("cipherstash")
            .database("cipherstash");

        BenchDatabase::lazy_pool(options, 0, 2, Arc::new(ReportConfig::default().init()))
    }

    #[tokio::test]
    async fn close_only_runs_once() {
        let database = lazy_database();
        assert_eq!(ConnectionKind::Pool, database.kind());
        assert!(!database.is_closed());

        assert!(database.close().await.unwrap());
        assert!(database.is_closed());
        assert!(!database.close().await.unwrap());
    }

    #[tokio::test]
    async fn execute_after_close_fails() {
        let database = lazy_database();
        database.close().await.unwrap();

        let result = database
            .execute(
                "SELECT id FROM encrypted WHERE id = $1",
                &[SqlParam::Int(1)],
            )
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn params_convert_from_values() {
        assert_eq!(SqlParam::Int(7), SqlParam::from(7));
        assert_eq!(
            SqlParam::Text("user1@example.com".to_string()),
            SqlParam::from("user1@example.com".to_string())
        );
        assert_eq!(
            SqlParam::Json(serde_json::json!({"id": 7})),
            SqlParam::from(serde_json::json!({"id": 7}))
        );
    }
}
