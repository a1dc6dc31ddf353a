use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{BatchId, HistoryId};

/// Given answers keyed by position in the quiz session.
pub type AnswerMap = BTreeMap<usize, String>;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("batch title cannot be empty")]
    EmptyTitle,

    #[error("correct answers ({correct}) exceed total questions ({total})")]
    CorrectExceedsTotal { correct: u32, total: u32 },

    #[error("percentage must be within 0..=100, got {0}")]
    InvalidPercentage(f64),
}

/// Percentage of correct answers, rounded half-up to two decimals.
///
/// An empty quiz scores 0 rather than dividing by zero.
#[must_use]
pub fn score_percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    // Integer hundredths keep exact halves such as 1.005 from rounding down.
    let (correct, total) = (u64::from(correct), u64::from(total));
    let hundredths = (20_000 * correct + total) / (2 * total);
    f64::from(u32::try_from(hundredths).unwrap_or(u32::MAX)) / 100.0
}

/// A finished quiz attempt that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuizHistory {
    batch_id: BatchId,
    batch_title: String,
    total_questions: u32,
    correct_answers: u32,
    percentage: f64,
    time_taken_secs: u64,
    answers: AnswerMap,
}

impl NewQuizHistory {
    /// # Errors
    ///
    /// Returns `HistoryError` when the title is blank, the counts are
    /// inconsistent, or the percentage is out of range.
    pub fn new(
        batch_id: BatchId,
        batch_title: impl Into<String>,
        total_questions: u32,
        correct_answers: u32,
        percentage: f64,
        time_taken_secs: u64,
        answers: AnswerMap,
    ) -> Result<Self, HistoryError> {
        let batch_title = batch_title.into();
        if batch_title.trim().is_empty() {
            return Err(HistoryError::EmptyTitle);
        }
        if correct_answers > total_questions {
            return Err(HistoryError::CorrectExceedsTotal {
                correct: correct_answers,
                total: total_questions,
            });
        }
        if !percentage.is_finite() || !(0.0..=100.0).contains(&percentage) {
            return Err(HistoryError::InvalidPercentage(percentage));
        }

        Ok(Self {
            batch_id,
            batch_title,
            total_questions,
            correct_answers,
            percentage,
            time_taken_secs,
            answers,
        })
    }

    pub fn assign_id(self, id: HistoryId, created_at: DateTime<Utc>) -> QuizHistory {
        QuizHistory {
            id,
            record: self,
            created_at,
        }
    }

    #[must_use]
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    #[must_use]
    pub fn batch_title(&self) -> &str {
        &self.batch_title
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> u64 {
        self.time_taken_secs
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }
}

/// A stored quiz attempt. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizHistory {
    id: HistoryId,
    record: NewQuizHistory,
    created_at: DateTime<Utc>,
}

impl QuizHistory {
    #[must_use]
    pub fn id(&self) -> HistoryId {
        self.id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn batch_id(&self) -> BatchId {
        self.record.batch_id
    }

    #[must_use]
    pub fn batch_title(&self) -> &str {
        &self.record.batch_title
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.record.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.record.correct_answers
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.record.percentage
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> u64 {
        self.record.time_taken_secs
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.record.answers
    }
}
