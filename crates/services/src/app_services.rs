use std::sync::Arc;

use storage::repository::Storage;
use storage::sqlite::DEFAULT_MAX_CONNECTIONS;

use crate::Clock;
use crate::authoring_service::BatchAuthoringService;
use crate::error::AppServicesError;
use crate::history_service::QuizHistoryService;
use crate::quiz::QuizRunner;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    authoring: Arc<BatchAuthoringService>,
    history: Arc<QuizHistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        Self::new_sqlite_with_pool_size(db_url, clock, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Like [`AppServices::new_sqlite`] with an explicit connection pool size.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite_with_pool_size(
        db_url: &str,
        clock: Clock,
        max_connections: u32,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite_with_pool_size(db_url, max_connections).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let authoring = Arc::new(BatchAuthoringService::new(
            clock,
            Arc::clone(&storage.batches),
        ));
        let history = Arc::new(QuizHistoryService::new(
            clock,
            Arc::clone(&storage.histories),
        ));
        Self { authoring, history }
    }

    #[must_use]
    pub fn authoring(&self) -> Arc<BatchAuthoringService> {
        Arc::clone(&self.authoring)
    }

    #[must_use]
    pub fn history(&self) -> Arc<QuizHistoryService> {
        Arc::clone(&self.history)
    }

    /// A fresh quiz runner that records into this history service.
    #[must_use]
    pub fn quiz_runner(&self) -> QuizRunner {
        QuizRunner::new(self.history())
    }
}
