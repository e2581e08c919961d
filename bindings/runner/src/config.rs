//! Resolves the run configuration from environment variables.
//!
//! Every variable has a default so that a scenario runs against a local proxy with no
//! configuration at all. Empty values are treated the same as unset ones.

use std::collections::HashMap;
use std::env::VarError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use postgres_client_instrumented::prelude::{PgConnectOptions, PgSslMode};
use thiserror::Error;

pub const BENCH_TARGET: &str = "BENCH_TARGET";
pub const BENCH_DB_HOST: &str = "BENCH_DB_HOST";
pub const BENCH_PROXY_PORT: &str = "BENCH_PROXY_PORT";
pub const BENCH_DATABASE_PORT: &str = "BENCH_DATABASE_PORT";
pub const BENCH_DB_USER: &str = "BENCH_DB_USER";
pub const BENCH_DB_PASSWORD: &str = "BENCH_DB_PASSWORD";
pub const BENCH_DB_NAME: &str = "BENCH_DB_NAME";
pub const BENCH_DB_SSLMODE: &str = "BENCH_DB_SSLMODE";
pub const BENCH_POOL_MIN: &str = "BENCH_POOL_MIN";
pub const BENCH_POOL_MAX: &str = "BENCH_POOL_MAX";
pub const BENCH_VUS: &str = "BENCH_VUS";
pub const BENCH_DURATION: &str = "BENCH_DURATION";
pub const BENCH_PAYLOAD_MODE: &str = "BENCH_PAYLOAD_MODE";
pub const BENCH_P95_THRESHOLD: &str = "BENCH_P95_THRESHOLD";
pub const BENCH_RESULTS_DIR: &str = "BENCH_RESULTS_DIR";

const ALL_VARS: [&str; 15] = [
    BENCH_TARGET,
    BENCH_DB_HOST,
    BENCH_PROXY_PORT,
    BENCH_DATABASE_PORT,
    BENCH_DB_USER,
    BENCH_DB_PASSWORD,
    BENCH_DB_NAME,
    BENCH_DB_SSLMODE,
    BENCH_POOL_MIN,
    BENCH_POOL_MAX,
    BENCH_VUS,
    BENCH_DURATION,
    BENCH_PAYLOAD_MODE,
    BENCH_P95_THRESHOLD,
    BENCH_RESULTS_DIR,
];

pub const DEFAULT_PROXY_PORT: u16 = 6432;
pub const DEFAULT_DATABASE_PORT: u16 = 5532;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_USER: &str = "cipherstash";
const DEFAULT_PASSWORD: &str = "p@ssword";
const DEFAULT_DATABASE: &str = "cipherstash";
const DEFAULT_POOL_MIN: u32 = 2;
const DEFAULT_POOL_MAX: u32 = 10;
const DEFAULT_VUS: usize = 10;
const DEFAULT_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_RESULTS_DIR: &str = "results/bench";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid BENCH_TARGET: '{0}'. Expected 'proxy' or 'database'")]
    InvalidTarget(String),

    #[error("Invalid port in {var}: '{value}'. Expected a number between 1 and 65535")]
    InvalidPort { var: &'static str, value: String },

    #[error("BENCH_PROXY_PORT and BENCH_DATABASE_PORT are both {0}, the targets must use different ports")]
    SharedPort(u16),

    #[error("Invalid {var}: '{value}'. Expected {expected}")]
    InvalidNumber {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid duration in {var}: '{value}'. Expected a positive duration such as '30s' or '2m'")]
    InvalidDuration { var: &'static str, value: String },

    #[error("Invalid BENCH_DB_SSLMODE: '{0}'. Expected one of disable, allow, prefer, require, verify-ca, verify-full")]
    InvalidSslMode(String),

    #[error("Invalid BENCH_PAYLOAD_MODE: '{0}'. Expected 'extract', 'full' or 'dual'")]
    InvalidPayloadMode(String),

    #[error("BENCH_POOL_MIN ({min}) must not be greater than BENCH_POOL_MAX ({max})")]
    PoolBounds { min: u32, max: u32 },

    #[error("{0} is not valid unicode")]
    NotUnicode(&'static str),
}

/// Which endpoint the benchmark drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Target {
    /// The encrypting proxy
    #[default]
    Proxy,
    /// The database directly, as a baseline
    Database,
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proxy" => Ok(Target::Proxy),
            "database" | "postgres" => Ok(Target::Database),
            _ => Err(ConfigError::InvalidTarget(s.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Proxy => write!(f, "proxy"),
            Target::Database => write!(f, "database"),
        }
    }
}

/// Which large columns the large payload scenario writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadMode {
    /// Only the processed report, around 250 KB
    Extract,
    /// Only the raw bureau report, around 500 KB
    Full,
    /// Both documents in a single statement
    #[default]
    Dual,
}

impl FromStr for PayloadMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extract" => Ok(PayloadMode::Extract),
            "full" => Ok(PayloadMode::Full),
            "dual" => Ok(PayloadMode::Dual),
            _ => Err(ConfigError::InvalidPayloadMode(s.to_string())),
        }
    }
}

impl fmt::Display for PayloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadMode::Extract => write!(f, "extract"),
            PayloadMode::Full => write!(f, "full"),
            PayloadMode::Dual => write!(f, "dual"),
        }
    }
}

/// The fully resolved configuration for one scenario run.
///
/// Resolved once in the scenario entry point and stored in the runner context, after which it is
/// only read.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: Target,
    pub host: String,
    pub proxy_port: u16,
    pub database_port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: PgSslMode,
    pub pool_min: u32,
    pub pool_max: u32,
    pub vus: usize,
    pub duration: Duration,
    pub payload_mode: PayloadMode,
    /// Overrides the scenario's own p95 threshold when set.
    pub p95_threshold: Option<Duration>,
    pub results_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target: Target::default(),
            host: DEFAULT_HOST.to_string(),
            proxy_port: DEFAULT_PROXY_PORT,
            database_port: DEFAULT_DATABASE_PORT,
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            ssl_mode: PgSslMode::Disable,
            pool_min: DEFAULT_POOL_MIN,
            pool_max: DEFAULT_POOL_MAX,
            vus: DEFAULT_VUS,
            duration: DEFAULT_DURATION,
            payload_mode: PayloadMode::default(),
            p95_threshold: None,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

impl RunConfig {
    /// Resolve the configuration from the process environment.
    ///
    /// Only the `BENCH_*` variables are read, so unrelated variables are never inspected.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut env = HashMap::with_capacity(ALL_VARS.len());
        for var in ALL_VARS {
            match std::env::var(var) {
                Ok(value) => {
                    env.insert(var.to_string(), value);
                }
                Err(VarError::NotPresent) => {}
                Err(VarError::NotUnicode(_)) => return Err(ConfigError::NotUnicode(var)),
            }
        }

        Self::resolve(&env)
    }

    /// Resolve the configuration from a set of named inputs, falling back to the default for every
    /// input that is missing or empty.
    pub fn resolve(env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let lookup = |var: &str| {
            env.get(var)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let mut config = RunConfig::default();

        if let Some(value) = lookup(BENCH_TARGET) {
            config.target = value.parse()?;
        }
        if let Some(value) = lookup(BENCH_DB_HOST) {
            config.host = value.to_string();
        }
        if let Some(value) = lookup(BENCH_PROXY_PORT) {
            config.proxy_port = parse_port(BENCH_PROXY_PORT, value)?;
        }
        if let Some(value) = lookup(BENCH_DATABASE_PORT) {
            config.database_port = parse_port(BENCH_DATABASE_PORT, value)?;
        }
        if config.proxy_port == config.database_port {
            return Err(ConfigError::SharedPort(config.proxy_port));
        }
        if let Some(value) = lookup(BENCH_DB_USER) {
            config.user = value.to_string();
        }
        // Passwords are taken verbatim, surrounding whitespace included.
        if let Some(value) = env.get(BENCH_DB_PASSWORD).filter(|value| !value.is_empty()) {
            config.password = value.clone();
        }
        if let Some(value) = lookup(BENCH_DB_NAME) {
            config.database = value.to_string();
        }
        if let Some(value) = lookup(BENCH_DB_SSLMODE) {
            config.ssl_mode = PgSslMode::from_str(value)
                .map_err(|_| ConfigError::InvalidSslMode(value.to_string()))?;
        }
        if let Some(value) = lookup(BENCH_POOL_MIN) {
            config.pool_min = parse_number(BENCH_POOL_MIN, value, "a non-negative integer")?;
        }
        if let Some(value) = lookup(BENCH_POOL_MAX) {
            config.pool_max = parse_number(BENCH_POOL_MAX, value, "a positive integer")?;
        }
        if config.pool_max == 0 {
            return Err(ConfigError::InvalidNumber {
                var: BENCH_POOL_MAX,
                value: "0".to_string(),
                expected: "a positive integer",
            });
        }
        if config.pool_min > config.pool_max {
            return Err(ConfigError::PoolBounds {
                min: config.pool_min,
                max: config.pool_max,
            });
        }
        if let Some(value) = lookup(BENCH_VUS) {
            config.vus = parse_number(BENCH_VUS, value, "a positive integer")?;
            if config.vus == 0 {
                return Err(ConfigError::InvalidNumber {
                    var: BENCH_VUS,
                    value: value.to_string(),
                    expected: "a positive integer",
                });
            }
        }
        if let Some(value) = lookup(BENCH_DURATION) {
            config.duration = parse_duration(BENCH_DURATION, value)?;
        }
        if let Some(value) = lookup(BENCH_PAYLOAD_MODE) {
            config.payload_mode = value.parse()?;
        }
        if let Some(value) = lookup(BENCH_P95_THRESHOLD) {
            config.p95_threshold = Some(parse_duration(BENCH_P95_THRESHOLD, value)?);
        }
        if let Some(value) = lookup(BENCH_RESULTS_DIR) {
            config.results_dir = PathBuf::from(value);
        }

        Ok(config)
    }

    /// The port of the selected target.
    pub fn port(&self) -> u16 {
        match self.target {
            Target::Proxy => self.proxy_port,
            Target::Database => self.database_port,
        }
    }

    /// `host:port` of the selected target, for log messages.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port())
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(self.ssl_mode)
    }
}

fn parse_port(var: &'static str, value: &str) -> Result<u16, ConfigError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: FromStr>(
    var: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
        expected,
    })
}

fn parse_duration(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match humantime::parse_duration(value) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(ConfigError::InvalidDuration {
            var,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn zero_configuration_uses_defaults() {
        let config = RunConfig::resolve(&HashMap::new()).unwrap();

        assert_eq!(Target::Proxy, config.target);
        assert_eq!("127.0.0.1", config.host);
        assert_eq!(6432, config.port());
        assert_eq!("cipherstash", config.user);
        assert_eq!("p@ssword", config.password);
        assert_eq!("cipherstash", config.database);
        assert!(matches!(config.ssl_mode, PgSslMode::Disable));
        assert_eq!((2, 10), (config.pool_min, config.pool_max));
        assert_eq!(10, config.vus);
        assert_eq!(Duration::from_secs(30), config.duration);
        assert_eq!(PayloadMode::Dual, config.payload_mode);
        assert_eq!(None, config.p95_threshold);
        assert_eq!(PathBuf::from("results/bench"), config.results_dir);
    }

    #[test]
    fn port_follows_target() {
        let proxy = RunConfig::resolve(&env(&[(BENCH_TARGET, "proxy")])).unwrap();
        let database = RunConfig::resolve(&env(&[(BENCH_TARGET, "database")])).unwrap();
        let postgres = RunConfig::resolve(&env(&[(BENCH_TARGET, "postgres")])).unwrap();

        assert_eq!(6432, proxy.port());
        assert_eq!(5532, database.port());
        assert_eq!(Target::Database, postgres.target);
        assert_ne!(proxy.port(), database.port());
    }

    #[test]
    fn port_selection_is_deterministic() {
        let inputs = env(&[(BENCH_TARGET, "database"), (BENCH_DATABASE_PORT, "15432")]);

        let first = RunConfig::resolve(&inputs).unwrap();
        let second = RunConfig::resolve(&inputs).unwrap();

        assert_eq!(15432, first.port());
        assert_eq!(first.port(), second.port());
        assert_eq!("127.0.0.1:15432", first.endpoint());
    }

    #[test]
    fn empty_values_are_unset() {
        let config = RunConfig::resolve(&env(&[
            (BENCH_TARGET, ""),
            (BENCH_DURATION, ""),
            (BENCH_DB_PASSWORD, ""),
        ]))
        .unwrap();

        assert_eq!(Target::Proxy, config.target);
        assert_eq!(Duration::from_secs(30), config.duration);
        assert_eq!("p@ssword", config.password);
    }

    #[test]
    fn overrides_are_applied() {
        let config = RunConfig::resolve(&env(&[
            (BENCH_DB_HOST, "proxy.internal"),
            (BENCH_VUS, "25"),
            (BENCH_DURATION, "2m"),
            (BENCH_PAYLOAD_MODE, "extract"),
            (BENCH_P95_THRESHOLD, "250ms"),
            (BENCH_POOL_MIN, "0"),
            (BENCH_POOL_MAX, "40"),
            (BENCH_DB_SSLMODE, "require"),
            (BENCH_RESULTS_DIR, "/tmp/bench"),
        ]))
        .unwrap();

        assert_eq!("proxy.internal", config.host);
        assert_eq!(25, config.vus);
        assert_eq!(Duration::from_secs(120), config.duration);
        assert_eq!(PayloadMode::Extract, config.payload_mode);
        assert_eq!(Some(Duration::from_millis(250)), config.p95_threshold);
        assert_eq!((0, 40), (config.pool_min, config.pool_max));
        assert!(matches!(config.ssl_mode, PgSslMode::Require));
        assert_eq!(PathBuf::from("/tmp/bench"), config.results_dir);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            ConfigError::InvalidTarget("staging".to_string()),
            RunConfig::resolve(&env(&[(BENCH_TARGET, "staging")])).unwrap_err()
        );
        assert_eq!(
            ConfigError::InvalidDuration {
                var: BENCH_DURATION,
                value: "soon".to_string()
            },
            RunConfig::resolve(&env(&[(BENCH_DURATION, "soon")])).unwrap_err()
        );
        assert_eq!(
            ConfigError::InvalidDuration {
                var: BENCH_DURATION,
                value: "0s".to_string()
            },
            RunConfig::resolve(&env(&[(BENCH_DURATION, "0s")])).unwrap_err()
        );
        assert_eq!(
            ConfigError::InvalidPort {
                var: BENCH_PROXY_PORT,
                value: "70000".to_string()
            },
            RunConfig::resolve(&env(&[(BENCH_PROXY_PORT, "70000")])).unwrap_err()
        );
        assert_eq!(
            ConfigError::InvalidPort {
                var: BENCH_DATABASE_PORT,
                value: "0".to_string()
            },
            RunConfig::resolve(&env(&[(BENCH_DATABASE_PORT, "0")])).unwrap_err()
        );
        assert_eq!(
            ConfigError::InvalidSslMode("sometimes".to_string()),
            RunConfig::resolve(&env(&[(BENCH_DB_SSLMODE, "sometimes")])).unwrap_err()
        );
        assert_eq!(
            ConfigError::InvalidPayloadMode("huge".to_string()),
            RunConfig::resolve(&env(&[(BENCH_PAYLOAD_MODE, "huge")])).unwrap_err()
        );
        assert!(matches!(
            RunConfig::resolve(&env(&[(BENCH_VUS, "0")])),
            Err(ConfigError::InvalidNumber { var: BENCH_VUS, .. })
        ));
        assert!(matches!(
            RunConfig::resolve(&env(&[(BENCH_VUS, "ten")])),
            Err(ConfigError::InvalidNumber { var: BENCH_VUS, .. })
        ));
    }

    #[test]
    fn targets_must_use_different_ports() {
        assert_eq!(
            ConfigError::SharedPort(6432),
            RunConfig::resolve(&env(&[(BENCH_DATABASE_PORT, "6432")])).unwrap_err()
        );
    }

    #[test]
    fn pool_bounds_are_checked() {
        assert_eq!(
            ConfigError::PoolBounds { min: 20, max: 10 },
            RunConfig::resolve(&env(&[(BENCH_POOL_MIN, "20")])).unwrap_err()
        );
        assert!(matches!(
            RunConfig::resolve(&env(&[(BENCH_POOL_MIN, "0"), (BENCH_POOL_MAX, "0")])),
            Err(ConfigError::InvalidNumber {
                var: BENCH_POOL_MAX,
                ..
            })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn from_env_ignores_unrelated_non_unicode_variables() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let garbled = OsStr::from_bytes(&[0x66, 0xff, 0x6f]);

        std::env::set_var("PROXY_BENCH_UNRELATED", garbled);
        let config = RunConfig::from_env();
        std::env::remove_var("PROXY_BENCH_UNRELATED");
        assert!(config.is_ok());

        std::env::set_var(BENCH_RESULTS_DIR, garbled);
        let config = RunConfig::from_env();
        std::env::remove_var(BENCH_RESULTS_DIR);
        assert_eq!(
            ConfigError::NotUnicode(BENCH_RESULTS_DIR),
            config.unwrap_err()
        );
    }

    #[test]
    fn errors_name_the_variable() {
        let err = RunConfig::resolve(&env(&[(BENCH_DURATION, "soon")])).unwrap_err();

        assert_eq!(
            "Invalid duration in BENCH_DURATION: 'soon'. Expected a positive duration such as '30s' or '2m'",
            err.to_string()
        );
    }
}
