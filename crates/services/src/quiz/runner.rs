use std::sync::Arc;

use quiz_core::model::{Batch, BatchId, Question};
use rand::Rng;
use tracing::{debug, warn};

use super::session::{QuizResult, QuizSession, QuizState};
use super::timer::QuizTimer;
use crate::error::QuizError;
use crate::history_service::QuizHistoryService;

/// Drives one quiz attempt: session state, the running clock, and the
/// history record written on finish.
pub struct QuizRunner {
    history: Arc<QuizHistoryService>,
    session: QuizSession,
    timer: Option<QuizTimer>,
    batch: Option<(BatchId, String)>,
}

impl QuizRunner {
    #[must_use]
    pub fn new(history: Arc<QuizHistoryService>) -> Self {
        Self {
            history,
            session: QuizSession::new(),
            timer: None,
            batch: None,
        }
    }

    /// Start a quiz over `questions` of `batch` using the thread RNG.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if a quiz is already running or finished.
    pub fn start(
        &mut self,
        batch: &Batch,
        questions: Vec<Question>,
        requested: usize,
    ) -> Result<(), QuizError> {
        self.start_with_rng(batch, questions, requested, &mut rand::rng())
    }

    /// Like [`QuizRunner::start`] with a caller-supplied RNG.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if a quiz is already running or finished.
    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        batch: &Batch,
        questions: Vec<Question>,
        requested: usize,
        rng: &mut R,
    ) -> Result<(), QuizError> {
        self.session.start(questions, requested, rng)?;
        self.batch = Some((batch.id(), batch.title().to_owned()));
        self.timer = Some(QuizTimer::start());
        debug!(batch_id = %batch.id(), questions = self.session.len(), "quiz started");
        Ok(())
    }

    /// # Errors
    ///
    /// See [`QuizSession::answer`].
    pub fn answer(&mut self, index: usize, value: impl Into<String>) -> Result<(), QuizError> {
        self.session.answer(index, value)
    }

    pub fn next(&mut self) -> usize {
        self.session.next()
    }

    pub fn previous(&mut self) -> usize {
        self.session.previous()
    }

    /// Stop the clock, score the attempt, and record it.
    ///
    /// A failed history write is logged; the returned result stands either way.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotInProgress` unless a quiz is running.
    pub async fn finish(&mut self) -> Result<QuizResult, QuizError> {
        if self.session.state() != QuizState::InProgress {
            return Err(QuizError::NotInProgress);
        }
        let elapsed = self.timer.as_mut().map_or(0, QuizTimer::stop);
        let result = self.session.finish(elapsed)?;

        if let Some((batch_id, title)) = &self.batch {
            match result.to_history(*batch_id, title) {
                Ok(record) => {
                    if let Err(err) = self.history.record(record).await {
                        warn!(%batch_id, error = %err, "failed to save quiz history");
                    }
                }
                Err(err) => warn!(%batch_id, error = %err, "quiz result is not a valid history record"),
            }
        }

        Ok(result)
    }

    /// Stop the clock and return to `NotStarted`.
    pub fn reset(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.stop();
        }
        self.session.reset();
        self.batch = None;
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    /// Seconds on the clock; frozen once the quiz is finished.
    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.timer.as_ref().map_or(0, QuizTimer::elapsed_secs)
    }

    #[must_use]
    pub fn is_timer_running(&self) -> bool {
        self.timer.as_ref().is_some_and(QuizTimer::is_running)
    }
}
