use std::sync::Arc;

use quiz_core::model::{NewQuizHistory, QuizHistory};
use storage::repository::{QuizHistoryRepository, StorageError};
use tracing::info;

use crate::Clock;
use crate::error::HistoryServiceError;

/// Records finished quiz attempts and lists them for review.
#[derive(Clone)]
pub struct QuizHistoryService {
    clock: Clock,
    histories: Arc<dyn QuizHistoryRepository>,
}

impl QuizHistoryService {
    #[must_use]
    pub fn new(clock: Clock, histories: Arc<dyn QuizHistoryRepository>) -> Self {
        Self { clock, histories }
    }

    /// Store a finished attempt, stamped with the service clock.
    ///
    /// # Errors
    ///
    /// Returns `HistoryServiceError::BatchNotFound` if the batch is gone and
    /// `HistoryServiceError::Storage` for other persistence failures.
    pub async fn record(&self, record: NewQuizHistory) -> Result<QuizHistory, HistoryServiceError> {
        let batch_id = record.batch_id();
        let history = self
            .histories
            .append_history(record, self.clock.now())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => HistoryServiceError::BatchNotFound(batch_id),
                other => HistoryServiceError::Storage(other),
            })?;

        info!(
            history_id = %history.id(),
            %batch_id,
            correct = history.correct_answers(),
            total = history.total_questions(),
            "recorded quiz attempt"
        );
        Ok(history)
    }

    /// All attempts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryServiceError::Storage` if repository access fails.
    pub async fn list_history(&self) -> Result<Vec<QuizHistory>, HistoryServiceError> {
        Ok(self.histories.list_history().await?)
    }
}
