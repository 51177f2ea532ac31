pub mod memory_repository;
pub mod pg_repository;
pub mod repositories;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::db::memory_repository::MemoryHistoryRepository;
use crate::db::pg_repository::PgHistoryRepository;
use crate::db::repositories::HistoryRepository;
use crate::errors::AppError;

/// Create a Postgres connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<PgPool, AppError> {
    info!("Connecting to database");
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(AppError::DatabaseConnectionFailed)
}

/// Picks the history backend: Postgres with migrations applied when a URL is
/// configured, otherwise the in-memory store.
pub async fn connect_history(
    database_url: Option<&str>,
) -> Result<Arc<dyn HistoryRepository>, AppError> {
    match database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|e| AppError::Unexpected(format!("Failed to run database migrations: {e}")))?;
            info!("Database connection established and migrations applied");
            Ok(Arc::new(PgHistoryRepository::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set; chat history is kept in memory and lost on restart");
            Ok(Arc::new(MemoryHistoryRepository::new()))
        }
    }
}
