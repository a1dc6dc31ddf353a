use quiz_core::model::{AnswerMap, BatchId, HistoryError, NewQuizHistory, Question, score_percentage};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::QuizError;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a quiz attempt.
///
/// `Finished` only leads back to `NotStarted` through [`QuizSession::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuizState {
    #[default]
    NotStarted,
    InProgress,
    Finished,
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

/// Score of a finished attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResult {
    pub total_questions: u32,
    pub correct_answers: u32,
    pub percentage: f64,
    pub time_taken_secs: u64,
    pub answers: AnswerMap,
}

impl QuizResult {
    /// Build the history record for this result.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the title is blank.
    pub fn to_history(
        &self,
        batch_id: BatchId,
        batch_title: &str,
    ) -> Result<NewQuizHistory, HistoryError> {
        NewQuizHistory::new(
            batch_id,
            batch_title,
            self.total_questions,
            self.correct_answers,
            self.percentage,
            self.time_taken_secs,
            self.answers.clone(),
        )
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Subset, order, and answers of one quiz attempt.
///
/// Pure state: timing is supplied by the caller on [`QuizSession::finish`].
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    state: QuizState,
    questions: Vec<Question>,
    answers: AnswerMap,
    current: usize,
    result: Option<QuizResult>,
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shuffle `questions` and keep the first `requested` of them.
    ///
    /// Asking for more questions than exist uses all of them.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyInProgress` or `QuizError::AlreadyFinished`
    /// unless the session is `NotStarted`.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        mut questions: Vec<Question>,
        requested: usize,
        rng: &mut R,
    ) -> Result<(), QuizError> {
        match self.state {
            QuizState::NotStarted => {}
            QuizState::InProgress => return Err(QuizError::AlreadyInProgress),
            QuizState::Finished => return Err(QuizError::AlreadyFinished),
        }

        // Fisher-Yates
        questions.shuffle(rng);
        questions.truncate(requested.min(questions.len()));

        self.questions = questions;
        self.answers.clear();
        self.current = 0;
        self.result = None;
        self.state = QuizState::InProgress;
        Ok(())
    }

    /// Record or overwrite the answer for the question at `index`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotInProgress` outside a running quiz and
    /// `QuizError::IndexOutOfRange` for positions outside the session.
    pub fn answer(&mut self, index: usize, value: impl Into<String>) -> Result<(), QuizError> {
        self.ensure_in_progress()?;
        if index >= self.questions.len() {
            return Err(QuizError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        self.answers.insert(index, value.into());
        Ok(())
    }

    /// Move forward one question; stays put on the last one.
    pub fn next(&mut self) -> usize {
        if self.state == QuizState::InProgress && self.current + 1 < self.questions.len() {
            self.current += 1;
        }
        self.current
    }

    /// Move back one question; stays put on the first one.
    pub fn previous(&mut self) -> usize {
        if self.state == QuizState::InProgress {
            self.current = self.current.saturating_sub(1);
        }
        self.current
    }

    /// Score the session with exact answer matching and mark it finished.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotInProgress` unless a quiz is running.
    pub fn finish(&mut self, elapsed_secs: u64) -> Result<QuizResult, QuizError> {
        self.ensure_in_progress()?;

        let correct = self
            .questions
            .iter()
            .enumerate()
            .filter(|(i, q)| self.answers.get(i).is_some_and(|given| q.is_correct(given)))
            .count();
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        let correct = u32::try_from(correct).unwrap_or(u32::MAX);

        let result = QuizResult {
            total_questions: total,
            correct_answers: correct,
            percentage: score_percentage(correct, total),
            time_taken_secs: elapsed_secs,
            answers: self.answers.clone(),
        };

        self.state = QuizState::Finished;
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Drop everything and return to `NotStarted`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn ensure_in_progress(&self) -> Result<(), QuizError> {
        if self.state == QuizState::InProgress {
            Ok(())
        } else {
            Err(QuizError::NotInProgress)
        }
    }

    // Accessors
    #[must_use]
    pub fn state(&self) -> QuizState {
        self.state
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Result of the last `finish`, until the next reset.
    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }
}

/// Elapsed time as `m:ss`.
#[must_use]
pub fn format_elapsed(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Difficulty, QuestionId, QuestionKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question(id: u64, answer: &str) -> Question {
        Question {
            id: QuestionId::new(id),
            batch_id: BatchId::new(1),
            text: format!("Question {id}?"),
            kind: QuestionKind::TextAnswer,
            correct_answer: answer.to_owned(),
            difficulty: Difficulty::Medium,
        }
    }

    fn pool(n: u64) -> Vec<Question> {
        (1..=n).map(|i| question(i, &format!("answer {i}"))).collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn started(questions: Vec<Question>, requested: usize) -> QuizSession {
        let mut session = QuizSession::new();
        session.start(questions, requested, &mut rng()).unwrap();
        session
    }

    #[test]
    fn start_clamps_to_available_questions() {
        let session = started(pool(4), 10);
        assert_eq!(session.len(), 4);
        assert_eq!(session.state(), QuizState::InProgress);

        let session = started(pool(8), 3);
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let session = started(pool(20), 20);
        let mut ids: Vec<u64> = session.questions().iter().map(|q| q.id.value()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_gives_same_order() {
        let a = started(pool(10), 10);
        let b = started(pool(10), 10);
        assert_eq!(a.questions(), b.questions());
    }

    #[test]
    fn start_while_running_or_finished_is_rejected() {
        let mut session = started(pool(2), 2);
        assert_eq!(
            session.start(pool(2), 2, &mut rng()),
            Err(QuizError::AlreadyInProgress)
        );

        session.finish(0).unwrap();
        assert_eq!(
            session.start(pool(2), 2, &mut rng()),
            Err(QuizError::AlreadyFinished)
        );

        session.reset();
        assert!(session.start(pool(2), 2, &mut rng()).is_ok());
    }

    #[test]
    fn finish_scores_exact_matches() {
        let questions = vec![question(1, "A"), question(2, "X"), question(3, "C")];
        let mut session = started(questions, 3);
        // the question expecting "X" gets a wrong answer
        let given: Vec<String> = session
            .questions()
            .iter()
            .map(|q| match q.correct_answer.as_str() {
                "X" => "B".to_owned(),
                other => other.to_owned(),
            })
            .collect();
        for (i, value) in given.into_iter().enumerate() {
            session.answer(i, value).unwrap();
        }

        let result = session.finish(42).unwrap();
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.correct_answers, 2);
        assert!((result.percentage - 66.67).abs() < f64::EPSILON);
        assert_eq!(result.time_taken_secs, 42);
        assert_eq!(session.state(), QuizState::Finished);
        assert_eq!(session.result(), Some(&result));
    }

    #[test]
    fn answers_are_case_sensitive() {
        let mut session = started(vec![question(1, "Paris")], 1);
        session.answer(0, "paris").unwrap();
        assert_eq!(session.finish(1).unwrap().correct_answers, 0);
    }

    #[test]
    fn empty_session_scores_zero() {
        let mut session = started(Vec::new(), 5);
        assert!(session.is_empty());
        let result = session.finish(0).unwrap();
        assert_eq!(result.total_questions, 0);
        assert!(result.percentage.abs() < f64::EPSILON);
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let mut session = started(pool(3), 3);
        assert_eq!(session.previous(), 0);
        assert_eq!(session.next(), 1);
        assert_eq!(session.next(), 2);
        assert_eq!(session.next(), 2);
        assert_eq!(session.previous(), 1);
        assert_eq!(
            session.current_question().map(|q| q.id),
            Some(session.questions()[1].id)
        );
    }

    #[test]
    fn answer_overwrites_and_checks_bounds() {
        let mut session = started(pool(2), 2);
        session.answer(1, "first").unwrap();
        session.answer(1, "second").unwrap();
        assert_eq!(session.answers().get(&1).map(String::as_str), Some("second"));
        assert_eq!(session.answered_count(), 1);
        assert_eq!(
            session.answer(2, "x"),
            Err(QuizError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn answering_before_start_is_rejected() {
        let mut session = QuizSession::new();
        assert_eq!(session.answer(0, "x"), Err(QuizError::NotInProgress));
        assert_eq!(session.finish(0), Err(QuizError::NotInProgress));
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = started(pool(3), 3);
        session.answer(0, "x").unwrap();
        session.next();
        session.reset();
        assert_eq!(session.state(), QuizState::NotStarted);
        assert!(session.is_empty());
        assert!(session.answers().is_empty());
        assert_eq!(session.current_index(), 0);
        assert!(session.result().is_none());
    }

    #[test]
    fn result_converts_to_history_record() {
        let mut session = started(vec![question(1, "A")], 1);
        session.answer(0, "A").unwrap();
        let record = session
            .finish(65)
            .unwrap()
            .to_history(BatchId::new(1), "Letters")
            .unwrap();
        assert_eq!(record.correct_answers(), 1);
        assert_eq!(record.time_taken_secs(), 65);
    }

    #[test]
    fn elapsed_formats_as_minutes_and_seconds() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(65), "1:05");
        assert_eq!(format_elapsed(3_600), "60:00");
    }
}
