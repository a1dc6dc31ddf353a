use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    Batch, BatchId, HistoryId, NewQuizHistory, Question, QuestionId, QuizHistory, ValidatedBatch,
    ValidatedQuestion,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for batches and the questions they own.
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Persist a batch together with its questions.
    ///
    /// Either every row is written or none is. `question_count` of the
    /// returned batch equals `questions.len()`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch cannot be stored.
    async fn create_batch(
        &self,
        batch: ValidatedBatch,
        questions: Vec<ValidatedQuestion>,
    ) -> Result<(Batch, Vec<Question>), StorageError>;

    /// List all batches, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_batches(&self) -> Result<Vec<Batch>, StorageError>;

    /// Fetch a batch by ID, `None` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_batch(&self, id: BatchId) -> Result<Option<Batch>, StorageError>;

    /// Questions of a batch in authoring order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_questions(&self, batch_id: BatchId) -> Result<Vec<Question>, StorageError>;

    /// Fetch a single question, `None` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// Overwrite a question's correct answer. Returns `false` if the
    /// question does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn update_correct_answer(
        &self,
        id: QuestionId,
        answer: &str,
    ) -> Result<bool, StorageError>;

    /// Delete batches, cascading to their questions and quiz history.
    /// Returns the number of batches removed; unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_batches(&self, ids: &[BatchId]) -> Result<u64, StorageError>;
}

/// Repository contract for completed quiz attempts.
#[async_trait]
pub trait QuizHistoryRepository: Send + Sync {
    /// Append a quiz attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the referenced batch is missing,
    /// or other storage errors.
    async fn append_history(
        &self,
        record: NewQuizHistory,
        created_at: DateTime<Utc>,
    ) -> Result<QuizHistory, StorageError>;

    /// List every attempt, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_history(&self) -> Result<Vec<QuizHistory>, StorageError>;
}

#[derive(Default)]
struct InMemoryState {
    last_batch_id: u64,
    last_question_id: u64,
    last_history_id: u64,
    batches: BTreeMap<BatchId, Batch>,
    questions: BTreeMap<QuestionId, Question>,
    histories: BTreeMap<HistoryId, QuizHistory>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, u64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl BatchRepository for InMemoryRepository {
    async fn create_batch(
        &self,
        batch: ValidatedBatch,
        questions: Vec<ValidatedQuestion>,
    ) -> Result<(Batch, Vec<Question>), StorageError> {
        let count = u32::try_from(questions.len())
            .map_err(|_| StorageError::Serialization("question count overflow".into()))?;
        let mut guard = self.lock()?;

        guard.last_batch_id += 1;
        let batch = batch.assign_id(BatchId::new(guard.last_batch_id), count);

        let mut stored = Vec::with_capacity(questions.len());
        for question in questions {
            guard.last_question_id += 1;
            let question = question.assign_ids(QuestionId::new(guard.last_question_id), batch.id());
            guard.questions.insert(question.id, question.clone());
            stored.push(question);
        }
        guard.batches.insert(batch.id(), batch.clone());

        Ok((batch, stored))
    }

    async fn list_batches(&self) -> Result<Vec<Batch>, StorageError> {
        let guard = self.lock()?;
        let mut batches: Vec<Batch> = guard.batches.values().cloned().collect();
        newest_first(&mut batches, |b| (b.created_at(), b.id().value()));
        Ok(batches)
    }

    async fn get_batch(&self, id: BatchId) -> Result<Option<Batch>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.batches.get(&id).cloned())
    }

    async fn get_questions(&self, batch_id: BatchId) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        // ids are handed out in insertion order, so the map order is authoring order
        Ok(guard
            .questions
            .values()
            .filter(|q| q.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.questions.get(&id).cloned())
    }

    async fn update_correct_answer(
        &self,
        id: QuestionId,
        answer: &str,
    ) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        match guard.questions.get_mut(&id) {
            Some(question) => {
                answer.clone_into(&mut question.correct_answer);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_batches(&self, ids: &[BatchId]) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let mut deleted = 0_u64;
        for id in ids {
            if guard.batches.remove(id).is_some() {
                deleted += 1;
            }
        }
        guard.questions.retain(|_, q| !ids.contains(&q.batch_id));
        guard.histories.retain(|_, h| !ids.contains(&h.batch_id()));
        Ok(deleted)
    }
}

#[async_trait]
impl QuizHistoryRepository for InMemoryRepository {
    async fn append_history(
        &self,
        record: NewQuizHistory,
        created_at: DateTime<Utc>,
    ) -> Result<QuizHistory, StorageError> {
        let mut guard = self.lock()?;
        if !guard.batches.contains_key(&record.batch_id()) {
            return Err(StorageError::NotFound);
        }
        guard.last_history_id += 1;
        let history = record.assign_id(HistoryId::new(guard.last_history_id), created_at);
        guard.histories.insert(history.id(), history.clone());
        Ok(history)
    }

    async fn list_history(&self) -> Result<Vec<QuizHistory>, StorageError> {
        let guard = self.lock()?;
        let mut histories: Vec<QuizHistory> = guard.histories.values().cloned().collect();
        newest_first(&mut histories, |h| (h.created_at(), h.id().value()));
        Ok(histories)
    }
}

/// Aggregates batch and history repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub batches: Arc<dyn BatchRepository>,
    pub histories: Arc<dyn QuizHistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let batches: Arc<dyn BatchRepository> = Arc::new(repo.clone());
        let histories: Arc<dyn QuizHistoryRepository> = Arc::new(repo);
        Self { batches, histories }
    }
}
