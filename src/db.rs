//! Database pool management for the Pressrelay API.
//!
//! SeaORM over Postgres in deployment and SQLite in tests; the pool is built
//! once at startup and shared through `AppState`.

use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tokio::time::sleep;

use crate::config::AppConfig;

/// Errors that can occur while establishing database connectivity.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("failed to connect to database: {source}")]
    ConnectionFailed {
        #[from]
        source: sea_orm::DbErr,
    },
    #[error("invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Initialize the SeaORM connection pool, retrying transient failures with
/// exponential backoff.
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "database URL cannot be empty".to_string(),
        }
        .into());
    }

    let mut options = ConnectOptions::new(&cfg.database_url);
    options
        .max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let max_attempts = 5;
    let mut retry_delay = Duration::from_millis(100);

    for attempt in 1..=max_attempts {
        match Database::connect(options.clone()).await {
            Ok(conn) => {
                tracing::info!(attempt, "database connection established");
                return Ok(conn);
            }
            Err(err) if attempt < max_attempts => {
                tracing::warn!(
                    attempt,
                    error = %err,
                    retry_delay_ms = retry_delay.as_millis() as u64,
                    "database connection attempt failed, retrying"
                );
                sleep(retry_delay).await;
                retry_delay *= 2;
            }
            Err(err) => {
                tracing::error!(
                    attempts = max_attempts,
                    error = %err,
                    "giving up on database connection"
                );
                return Err(DatabaseError::ConnectionFailed { source: err }.into());
            }
        }
    }

    unreachable!("connection loop returns on every attempt")
}

/// Verify the pool can still serve queries.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    use sea_orm::Statement;

    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());
    db.query_one(stmt)
        .await
        .context("database health check failed")?;

    Ok(())
}
