use crate::cli::BenchScenarioCli;
use clap::Parser;

/// Initialise logging and parse the command line for a scenario binary.
pub fn init() -> BenchScenarioCli {
    env_logger::init();

    BenchScenarioCli::parse()
}
