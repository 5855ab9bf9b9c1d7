use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "taxonomy.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:37240";
pub const DEFAULT_POOL_SIZE: u32 = 8;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid bind address '{0}'")]
    InvalidBindAddr(String),

    #[error("Invalid pool size '{0}': expected an integer of at least 1")]
    InvalidPoolSize(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub pool_size: u32,
}

impl Config {
    /// Reads `DATABASE_URL`, `TAXONOMY_BIND_ADDR` and `DATABASE_POOL_SIZE`.
    /// Call `dotenv::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = match lookup("TAXONOMY_BIND_ADDR") {
            Some(raw) => parse_bind_addr(&raw)?,
            None => parse_bind_addr(DEFAULT_BIND_ADDR)?,
        };

        let pool_size = match lookup("DATABASE_POOL_SIZE") {
            Some(raw) => parse_pool_size(&raw)?,
            None => DEFAULT_POOL_SIZE,
        };

        Ok(Self {
            database_url,
            bind_addr,
            pool_size,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 37240)),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

pub fn parse_bind_addr(raw: &str) -> Result<SocketAddr, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidBindAddr(raw.to_string()))
}

pub fn parse_pool_size(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(size) if size >= 1 => Ok(size),
        _ => Err(ConfigError::InvalidPoolSize(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_is_empty() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_reads_all_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "/tmp/tax.db"),
            ("TAXONOMY_BIND_ADDR", "0.0.0.0:8080"),
            ("DATABASE_POOL_SIZE", "3"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "/tmp/tax.db");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.pool_size, 3);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_addr = Config::from_lookup(lookup_from(&[("TAXONOMY_BIND_ADDR", "nowhere")]));
        assert_eq!(
            bad_addr,
            Err(ConfigError::InvalidBindAddr("nowhere".to_string()))
        );

        let zero_pool = Config::from_lookup(lookup_from(&[("DATABASE_POOL_SIZE", "0")]));
        assert_eq!(zero_pool, Err(ConfigError::InvalidPoolSize("0".to_string())));
    }
}
