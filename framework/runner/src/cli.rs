use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReporterOpt {
    /// Discard operation records
    Noop,
    /// Aggregate operation records in memory and print them as a table at the end of the run
    InMemory,
}

/// Command line options shared by every benchmark scenario.
///
/// Target, concurrency and duration are read from the environment so that CI can drive every
/// scenario binary the same way. The flags here only change how the run is presented.
#[derive(Debug, Clone, Parser)]
#[command(about, long_about = None)]
pub struct BenchScenarioCli {
    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// The reporter to use for timed database operations.
    #[arg(long, value_enum, default_value_t = ReporterOpt::InMemory)]
    pub reporter: ReporterOpt,

    /// Set the ID of this run
    ///
    /// If not set, a random ID is used.
    #[arg(long, short)]
    pub run_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_in_memory_reporter() {
        let cli = BenchScenarioCli::parse_from(["jsonb-insert"]);

        assert!(!cli.no_progress);
        assert_eq!(ReporterOpt::InMemory, cli.reporter);
        assert!(cli.run_id.is_none());
    }

    #[test]
    fn parses_all_flags() {
        let cli = BenchScenarioCli::parse_from([
            "jsonb-insert",
            "--no-progress",
            "--reporter",
            "noop",
            "--run-id",
            "nightly-42",
        ]);

        assert!(cli.no_progress);
        assert_eq!(ReporterOpt::Noop, cli.reporter);
        assert_eq!(Some("nightly-42".to_string()), cli.run_id);
    }
}
