//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use quiz_core::model::{BatchError, BatchId, HistoryError, QuestionError, QuestionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Comma-separated id list for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdList(pub Vec<BatchId>);

impl fmt::Display for IdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// Errors emitted by `BatchAuthoringService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthoringError {
    #[error("at least one question is required")]
    NoQuestions,
    /// `index` is 1-based, matching how authors count questions.
    #[error("question {index}: {source}")]
    InvalidQuestion {
        index: usize,
        #[source]
        source: QuestionError,
    },
    #[error("no multiple choice questions found in the pasted text")]
    NothingParsed,
    #[error("at least one batch id is required")]
    NoBatchIds,
    #[error("question {id}: {source}")]
    InvalidAnswer {
        id: QuestionId,
        #[source]
        source: QuestionError,
    },
    #[error("batch {0} not found")]
    BatchNotFound(BatchId),
    #[error("none of the given questions exist")]
    QuestionsNotFound,
    #[error("batches not found: {0}")]
    BatchesNotFound(IdList),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AuthoringError {
    /// True for errors caused by the caller's input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AuthoringError::NoQuestions
                | AuthoringError::InvalidQuestion { .. }
                | AuthoringError::NothingParsed
                | AuthoringError::NoBatchIds
                | AuthoringError::InvalidAnswer { .. }
                | AuthoringError::Batch(_)
        )
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AuthoringError::BatchNotFound(_)
                | AuthoringError::QuestionsNotFound
                | AuthoringError::BatchesNotFound(_)
        )
    }
}

/// Errors emitted by `QuizHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryServiceError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("batch {0} not found")]
    BatchNotFound(BatchId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the quiz engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("a quiz is already in progress")]
    AlreadyInProgress,
    #[error("the quiz is finished; reset before starting again")]
    AlreadyFinished,
    #[error("no quiz is in progress")]
    NotInProgress,
    #[error("question index {index} is outside the session of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
