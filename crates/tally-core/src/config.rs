//! Process configuration, read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `TALLY_BACKEND` | `memory` (`memory`, `redis` or `amqp`) |
//! | `REDIS_URL` | required for `redis` |
//! | `AMQP_URL` | required for `amqp` |
//! | `AMQP_QUEUE` | `factory_checkin_tasks` |
//! | `TALLY_QUEUE_CAPACITY` | 1000 |
//! | `TALLY_POLL_INTERVAL_MS` | 1000 |
//! | `TALLY_POP_TIMEOUT_SECS` | 1 |
//! | `TALLY_RETRY_UNIT_SECS` | 60 |
//! | `TALLY_REPORT_DELAY_MS` | 500 |

use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::queue::{DEFAULT_CAPACITY, DEFAULT_QUEUE_NAME};

/// Which queue backend to run, with its connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Memory { capacity: usize },
    Redis { url: String, pop_timeout: Duration },
    Amqp { url: String, queue: String },
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Memory { .. } => "memory",
            BackendConfig::Redis { .. } => "redis",
            BackendConfig::Amqp { .. } => "amqp",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: BackendConfig,
    pub poll_interval: Duration,
    pub retry_unit: Duration,
    /// Simulated latency of the logging reporting client.
    pub report_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("TALLY_BACKEND").as_deref().map(str::trim) {
            None | Some("memory") => BackendConfig::Memory {
                capacity: parse_or(&get, "TALLY_QUEUE_CAPACITY", DEFAULT_CAPACITY)?,
            },
            Some("redis") => BackendConfig::Redis {
                url: get("REDIS_URL").ok_or(ConfigError::Missing("REDIS_URL"))?,
                pop_timeout: Duration::from_secs(parse_or(&get, "TALLY_POP_TIMEOUT_SECS", 1)?),
            },
            Some("amqp") => BackendConfig::Amqp {
                url: get("AMQP_URL").ok_or(ConfigError::Missing("AMQP_URL"))?,
                queue: get("AMQP_QUEUE").unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
            },
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        Ok(Self {
            backend,
            poll_interval: Duration::from_millis(parse_or(&get, "TALLY_POLL_INTERVAL_MS", 1000)?),
            retry_unit: Duration::from_secs(parse_or(&get, "TALLY_RETRY_UNIT_SECS", 60)?),
            report_delay: Duration::from_millis(parse_or(&get, "TALLY_REPORT_DELAY_MS", 500)?),
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
