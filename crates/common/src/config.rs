//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database connection URL (PostgreSQL)
    pub database_url: String,

    /// Connection pool sizing
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_max_idle_time_secs: u64,
    pub db_connect_timeout_secs: u64,

    /// Upper bound for one repository operation
    pub query_timeout_ms: u64,

    /// Optional JSON file of films to seed an empty catalog with
    pub seed_file: Option<String>,

    /// Runtime configuration
    pub app_env: String,
    pub rust_log: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL is required"))?,

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 25)?,
            db_min_connections: parse_var("DB_MIN_CONNECTIONS", 0)?,
            db_max_idle_time_secs: parse_var("DB_MAX_IDLE_TIME_SECS", 900)?,
            db_connect_timeout_secs: parse_var("DB_CONNECT_TIMEOUT_SECS", 5)?,
            query_timeout_ms: parse_var("QUERY_TIMEOUT_MS", 3000)?,

            seed_file: env::var("SEED_FILE").ok().filter(|path| !path.is_empty()),

            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "reelbase=debug".to_string()),
        };

        if config.db_min_connections > config.db_max_connections {
            anyhow::bail!(
                "DB_MIN_CONNECTIONS ({}) must not exceed DB_MAX_CONNECTIONS ({})",
                config.db_min_connections,
                config.db_max_connections
            );
        }

        Ok(config)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn db_max_idle_time(&self) -> Duration {
        Duration::from_secs(self.db_max_idle_time_secs)
    }

    pub fn db_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connect_timeout_secs)
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
