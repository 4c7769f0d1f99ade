use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    pub cache_capacity: u64,
    pub sqlite_path: Option<PathBuf>,
    pub max_query_rows: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_file_size: default_max_file_size(),
            cache_capacity: 256,
            sqlite_path: None,
            max_query_rows: 10_000,
        }
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Config {
            bind_addr: parse_or(&lookup, "STATS_BIND_ADDR", defaults.bind_addr)?,
            max_file_size: parse_or(&lookup, "STATS_MAX_FILE_SIZE", defaults.max_file_size)?,
            cache_capacity: parse_or(&lookup, "STATS_CACHE_CAPACITY", defaults.cache_capacity)?,
            sqlite_path: lookup("STATS_SQLITE_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            max_query_rows: parse_or(&lookup, "STATS_MAX_QUERY_ROWS", defaults.max_query_rows)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::new()?;
    tracing::debug!("Loaded configuration: {:?}", config);
    Ok(config)
}
