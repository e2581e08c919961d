/// Return this error from a virtual user's iteration to stop the whole run.
///
/// Ordinary statement failures are recorded as failed iterations and the run carries on. This
/// error is for the cases where no further iteration can succeed, such as the connection to the
/// system under test being lost. The runner stops scheduling iterations, runs the teardown hook
/// and then reports the run as failed.
#[derive(derive_more::Error, derive_more::Display, Debug)]
#[display("{msg}")]
pub struct AbortRunError {
    msg: String,
}

impl AbortRunError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl Default for AbortRunError {
    fn default() -> Self {
        Self {
            msg: "Run aborted".to_string(),
        }
    }
}
