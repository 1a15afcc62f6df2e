//! Service configuration, read from `CALC_*` environment variables.

use anyhow::{Context, Result};
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_NAME: &str = "calculator";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_LOG_DIR: &str = "logs";

const APP_DIR: &str = "calculator-service";

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Logical name, reported by the health endpoint.
    pub name: String,
    pub path: PathBuf,
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection.
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = lookup("CALC_DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string());
        let path = lookup("CALC_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_db_path(&name));

        let database = DatabaseConfig {
            path,
            max_connections: parse_var(&lookup, "CALC_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            acquire_timeout: Duration::from_secs(parse_var(
                &lookup,
                "CALC_DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?),
            name,
        };

        Ok(Self {
            host: lookup("CALC_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(&lookup, "CALC_PORT", DEFAULT_PORT)?,
            database,
            log_dir: lookup("CALC_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }
}

/// `<data dir>/calculator-service/<name>.db`, relative to `data/` when the
/// platform has no data directory.
pub fn default_db_path(name: &str) -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("data"));
    path.push(APP_DIR);
    path.push(format!("{name}.db"));
    path
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
