//! Connection pool for the account store.

use std::time::{Duration, Instant};

use sqlx::mysql::{MySqlPoolOptions, MySqlPool};

use crate::config::DbConfig;
use error::DatabaseError;

/// Type alias for MySQL connection pool.
pub type DbPool = MySqlPool;

/// Idle connections are recycled before MySQL's server-side timeout closes them.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Pool settings derived from the configuration.
pub fn pool_options(config: &DbConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(IDLE_TIMEOUT)
        .test_before_acquire(true)
}

/// Connect a pool to the configured database.
pub async fn create_pool(config: &DbConfig) -> Result<DbPool, DatabaseError> {
    tracing::info!(
        host = %config.host(),
        port = config.port(),
        database = config.database().unwrap_or_default(),
        "Connecting account database"
    );

    let pool = pool_options(config)
        .connect_with(config.connect_options())
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect account database: {}", e);
            DatabaseError::ConnectionFailed(e.to_string())
        })?;

    tracing::info!(max_connections = config.max_connections, "Database pool ready");
    Ok(pool)
}

/// Ping the database, returning the round-trip time.
pub async fn health_check(pool: &DbPool) -> Result<Duration, DatabaseError> {
    let started = Instant::now();
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

    let elapsed = started.elapsed();
    tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "Database ping");
    Ok(elapsed)
}
