//! Configuration resolution for the ingest engine
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`ROLLCALL_*`)
//! 3. TOML config file (`rollcall.toml`)
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

const DEFAULT_DATABASE: &str = "rollcall.db";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_HTTP_MAX_RETRIES: u32 = 3;
const DEFAULT_HTTP_RETRY_DELAY_MS: u64 = 500;
const DEFAULT_HOUSE_MISS_THRESHOLD: u32 = 10;
const DEFAULT_SENATE_MISS_THRESHOLD: u32 = 15;
const DEFAULT_CONGRESS: i64 = 118;
const DEFAULT_SESSION: i64 = 1;

/// Optional settings read from a `rollcall.toml` file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub database: Option<PathBuf>,
    pub http_timeout_secs: Option<u64>,
    pub http_max_retries: Option<u32>,
    pub http_retry_delay_ms: Option<u64>,
    pub house_miss_threshold: Option<u32>,
    pub senate_miss_threshold: Option<u32>,
    pub congress: Option<i64>,
    pub session: Option<i64>,
    pub house_year: Option<i32>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load an explicitly named config file (must exist), or the default
    /// `rollcall.toml` in the working directory when present.
    pub fn load_if_present(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = Path::new("rollcall.toml");
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Overrides supplied on the command line (highest priority)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub database: Option<PathBuf>,
    pub congress: Option<i64>,
    pub session: Option<i64>,
    pub house_year: Option<i32>,
}

/// Fully resolved ingest configuration
///
/// Constructed once at run start and passed into the driver and its
/// components; there is no process-global configuration state.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// SQLite database file
    pub database: PathBuf,
    /// Per-request HTTP timeout
    pub http_timeout_secs: u64,
    /// Retry attempts for transient fetch failures
    pub http_max_retries: u32,
    /// Initial backoff delay between retries
    pub http_retry_delay_ms: u64,
    /// Consecutive-miss threshold ending a House scan
    pub house_miss_threshold: u32,
    /// Consecutive-miss threshold ending a Senate scan
    pub senate_miss_threshold: u32,
    /// Congress number (e.g. 118)
    pub congress: i64,
    /// Session within the congress (1 or 2)
    pub session: i64,
    /// Calendar year used in House roll-call URLs
    pub house_year: i32,
}

impl IngestConfig {
    /// Resolve the full configuration from CLI, environment, TOML and defaults
    pub fn resolve(cli: &CliOverrides, config_path: Option<&Path>) -> Result<Self> {
        let file = TomlConfig::load_if_present(config_path)?;

        let database = cli
            .database
            .clone()
            .or_else(|| env_parse::<PathBuf>("ROLLCALL_DATABASE"))
            .or(file.database)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

        let http_timeout_secs = env_parse("ROLLCALL_HTTP_TIMEOUT_SECS")
            .or(file.http_timeout_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
        let http_max_retries = env_parse("ROLLCALL_HTTP_MAX_RETRIES")
            .or(file.http_max_retries)
            .unwrap_or(DEFAULT_HTTP_MAX_RETRIES);
        let http_retry_delay_ms = env_parse("ROLLCALL_HTTP_RETRY_DELAY_MS")
            .or(file.http_retry_delay_ms)
            .unwrap_or(DEFAULT_HTTP_RETRY_DELAY_MS);
        let house_miss_threshold = env_parse("ROLLCALL_HOUSE_MISS_THRESHOLD")
            .or(file.house_miss_threshold)
            .unwrap_or(DEFAULT_HOUSE_MISS_THRESHOLD);
        let senate_miss_threshold = env_parse("ROLLCALL_SENATE_MISS_THRESHOLD")
            .or(file.senate_miss_threshold)
            .unwrap_or(DEFAULT_SENATE_MISS_THRESHOLD);

        let congress = cli
            .congress
            .or_else(|| env_parse("ROLLCALL_CONGRESS"))
            .or(file.congress)
            .unwrap_or(DEFAULT_CONGRESS);
        let session = cli
            .session
            .or_else(|| env_parse("ROLLCALL_SESSION"))
            .or(file.session)
            .unwrap_or(DEFAULT_SESSION);

        if !(1..=2).contains(&session) {
            return Err(Error::Config(format!(
                "session must be 1 or 2, got {}",
                session
            )));
        }

        let house_year = cli
            .house_year
            .or_else(|| env_parse("ROLLCALL_HOUSE_YEAR"))
            .or(file.house_year)
            .unwrap_or_else(|| first_house_year(congress, session));

        Ok(Self {
            database,
            http_timeout_secs,
            http_max_retries,
            http_retry_delay_ms,
            house_miss_threshold,
            senate_miss_threshold,
            congress,
            session,
            house_year,
        })
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            http_max_retries: DEFAULT_HTTP_MAX_RETRIES,
            http_retry_delay_ms: DEFAULT_HTTP_RETRY_DELAY_MS,
            house_miss_threshold: DEFAULT_HOUSE_MISS_THRESHOLD,
            senate_miss_threshold: DEFAULT_SENATE_MISS_THRESHOLD,
            congress: DEFAULT_CONGRESS,
            session: DEFAULT_SESSION,
            house_year: first_house_year(DEFAULT_CONGRESS, DEFAULT_SESSION),
        }
    }
}

/// Calendar year of a congress session: the Nth congress convenes in
/// 1787 + 2N, and the second session runs the following year.
fn first_house_year(congress: i64, session: i64) -> i32 {
    (1787 + 2 * congress + (session - 1)) as i32
}

/// Read and parse an environment variable, warning (not failing) on
/// unparseable values so a bad override cannot abort a run.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key, value = %raw, "Ignoring unparseable environment override");
                None
            }
        },
        Err(_) => None,
    }
}
