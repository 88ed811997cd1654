//! Primary-store connection pool.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tempo_core::config::DatabaseConfig;
use tempo_core::error::{Error, Result};

/// Wraps a `sqlx::PgPool` behind the connection parameters `DatabaseConfig`
/// already validated at startup. Constructed once in `main` and passed
/// explicitly to every repository; there is no lazily-initialized global.
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.pool_min)
            .max_connections(config.pool_max)
            .acquire_timeout(config.connect_timeout())
            .connect(&config.connection_url())
            .await
            .map_err(|e| Error::store_unreachable_with_source("failed to connect to primary store", e))?;

        Ok(Self { pool })
    }

    pub fn inner(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::store_unreachable_with_source("primary store ping failed", e))?;
        Ok(())
    }
}
