//! Configuration management for the server.

use scoresync_engine::ConflictPolicy;
use std::env;
use std::time::Duration;

/// Default timeout applied to every store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL; the in-memory store is used when absent
    pub database_url: Option<String>,
    /// Pool size for PostgreSQL
    pub max_connections: u32,
    /// Shared secret expected in `x-blob-token` on pushes
    pub push_token: Option<String>,
    /// Upper bound on any single store call
    pub store_timeout: Duration,
    /// How incoming changes are weighed against stored records
    pub conflict_policy: ConflictPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            max_connections: 10,
            push_token: None,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let host = var("HOST").unwrap_or(defaults.host);

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.port,
        };

        let database_url = var("DATABASE_URL");

        let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidMaxConnections)?,
            None => defaults.max_connections,
        };

        let push_token = var("BLOB_READ_WRITE_TOKEN").or_else(|| var("VERCEL_BLOB_RW_TOKEN"));

        let store_timeout = match var("SYNC_STORE_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or(ConfigError::InvalidStoreTimeout)?,
            None => defaults.store_timeout,
        };

        let conflict_policy = match var("SYNC_CONFLICT_POLICY") {
            Some(raw) => raw
                .parse::<ConflictPolicy>()
                .map_err(|_| ConfigError::InvalidConflictPolicy(raw))?,
            None => defaults.conflict_policy,
        };

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            push_token,
            store_timeout,
            conflict_policy,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("DATABASE_MAX_CONNECTIONS must be a positive integer")]
    InvalidMaxConnections,

    #[error("SYNC_STORE_TIMEOUT_MS must be a positive integer")]
    InvalidStoreTimeout,

    #[error("Unknown SYNC_CONFLICT_POLICY '{0}' (expected 'last-write-wins' or 'overwrite')")]
    InvalidConflictPolicy(String),
}
