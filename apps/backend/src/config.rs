//! Service configuration read from the environment.

use anyhow::{Context, Result};
use review_core::DEFAULT_BATCH_SIZE;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Postgres connection string. Without it cards live in memory.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    /// Cards fetched per review session when the client does not ask for a size.
    pub review_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            host: "0.0.0.0".to_string(),
            port: 3000,
            review_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("invalid DATABASE_MAX_CONNECTIONS: {v}"))?,
            None => defaults.database_max_connections,
        };
        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = match lookup("PORT") {
            Some(v) => v.parse().with_context(|| format!("invalid PORT: {v}"))?,
            None => defaults.port,
        };
        let review_batch_size = match lookup("REVIEW_BATCH_SIZE") {
            Some(v) => v
                .parse()
                .with_context(|| format!("invalid REVIEW_BATCH_SIZE: {v}"))?,
            None => defaults.review_batch_size,
        };

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            review_batch_size,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
