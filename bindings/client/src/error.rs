use proxy_bench_core::prelude::AbortRunError;

/// Convert a driver error into an `anyhow::Error`.
///
/// Errors that mean the connection to the target is gone are turned into an [AbortRunError]. There
/// is no reconnect, so once the target drops the connection every following iteration would fail
/// and the run would only measure how fast errors are produced.
pub fn handle_sqlx_err(err: sqlx::Error) -> anyhow::Error {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
            AbortRunError::new(format!("Lost connection to the benchmark target: {err}")).into()
        }
        sqlx::Error::Database(db_err) => anyhow::anyhow!("Database error: {db_err}"),
        _ => anyhow::anyhow!("Database client error: {err:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_abort_the_run() {
        let err = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ));

        assert!(handle_sqlx_err(err).is::<AbortRunError>());
    }

    #[test]
    fn closed_pool_aborts_the_run() {
        assert!(handle_sqlx_err(sqlx::Error::PoolClosed).is::<AbortRunError>());
    }

    #[test]
    fn other_errors_fail_only_the_iteration() {
        let err = handle_sqlx_err(sqlx::Error::RowNotFound);

        assert!(!err.is::<AbortRunError>());
    }
}
