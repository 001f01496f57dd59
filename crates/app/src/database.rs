//! Database lifecycle: connect, migrate, hand out repositories, close

use std::time::Duration;

use reelbase_catalog::CatalogRepositories;
use reelbase_common::config::Config;
use reelbase_watchlist::WatchlistRepository;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// All repositories, sharing one pool and one query timeout
#[derive(Clone)]
pub struct Repositories {
    pub catalog: CatalogRepositories,
    pub watchlist: WatchlistRepository,
}

/// Owner of the connection pool.
///
/// Constructed once at startup and passed to whatever needs storage.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    query_timeout: Duration,
}

impl Database {
    /// Open a pool sized from `config` and verify one connection.
    pub async fn connect(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .min_connections(config.db_min_connections)
            .idle_timeout(config.db_max_idle_time())
            .acquire_timeout(config.db_connect_timeout())
            .connect(&config.database_url)
            .await?;

        tracing::info!(
            max_connections = config.db_max_connections,
            min_connections = config.db_min_connections,
            "Database pool established"
        );

        Ok(Self::from_pool(pool, config.query_timeout()))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            catalog: CatalogRepositories::new(self.pool.clone(), self.query_timeout),
            watchlist: WatchlistRepository::new(self.pool.clone())
                .with_query_timeout(self.query_timeout),
        }
    }

    /// Wait for checked-out connections to return, then close the pool
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
