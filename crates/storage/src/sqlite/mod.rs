use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{BatchRepository, QuizHistoryRepository, Storage};

mod batch_repo;
mod history_repo;
mod mapping;
mod migrate;

/// Pool size used when the caller does not pick one.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL and the default pool size.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// enforcing foreign key constraints fails during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::connect_with_pool_size(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connect with an explicit upper bound on pooled connections.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established.
    pub async fn connect_with_pool_size(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // cascade deletes from batches rely on this
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        Self::sqlite_with_pool_size(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Like [`Storage::sqlite`] with an explicit pool size.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite_with_pool_size(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect_with_pool_size(database_url, max_connections).await?;
        repo.migrate().await?;
        let batches: Arc<dyn BatchRepository> = Arc::new(repo.clone());
        let histories: Arc<dyn QuizHistoryRepository> = Arc::new(repo);
        Ok(Self { batches, histories })
    }
}
