use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{BatchId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("correct answer cannot be empty")]
    EmptyAnswer,

    #[error("multiple choice questions need at least 2 choices, got {count}")]
    TooFewChoices { count: usize },

    #[error("correct answer {answer:?} must be one of the choices")]
    AnswerNotInChoices { answer: String },

    #[error("unknown question type: {0}")]
    UnknownKind(String),

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(QuestionError::UnknownDifficulty(other.to_owned())),
        }
    }
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// How a question is answered.
///
/// Choices only exist for `MultipleChoice`, so there is no "text question with
/// a stray choice list" state to guard against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    TextAnswer,
    MultipleChoice { choices: Vec<String> },
}

impl QuestionKind {
    pub const TEXT: &'static str = "text";
    pub const MULTIPLE_CHOICE: &'static str = "multiple_choice";

    /// Wire/storage tag for this kind.
    #[must_use]
    pub fn type_str(&self) -> &'static str {
        match self {
            QuestionKind::TextAnswer => Self::TEXT,
            QuestionKind::MultipleChoice { .. } => Self::MULTIPLE_CHOICE,
        }
    }

    #[must_use]
    pub fn choices(&self) -> Option<&[String]> {
        match self {
            QuestionKind::TextAnswer => None,
            QuestionKind::MultipleChoice { choices } => Some(choices),
        }
    }

    /// Rebuild a kind from its tag and optional choices.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownKind` for unrecognised tags.
    pub fn from_parts(tag: &str, choices: Option<Vec<String>>) -> Result<Self, QuestionError> {
        match tag {
            Self::TEXT => Ok(QuestionKind::TextAnswer),
            Self::MULTIPLE_CHOICE => Ok(QuestionKind::MultipleChoice {
                choices: choices.unwrap_or_default(),
            }),
            other => Err(QuestionError::UnknownKind(other.to_owned())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// A question before it is persisted: parser output or manually authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub text: String,
    pub kind: QuestionKind,
    pub correct_answer: String,
    pub difficulty: Difficulty,
}

impl QuestionDraft {
    pub fn text_answer(text: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: QuestionKind::TextAnswer,
            correct_answer: answer.into(),
            difficulty: Difficulty::Medium,
        }
    }

    pub fn multiple_choice(
        text: impl Into<String>,
        choices: Vec<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            kind: QuestionKind::MultipleChoice { choices },
            correct_answer: answer.into(),
            difficulty: Difficulty::Medium,
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Validate a draft for persistence.
    ///
    /// Blank choices are dropped before the multiple-choice checks run.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when text or answer is blank, when a multiple
    /// choice question has fewer than two non-blank choices, or when the
    /// answer is not one of them.
    pub fn validate(self) -> Result<ValidatedQuestion, QuestionError> {
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let correct_answer = self.correct_answer.trim().to_owned();
        if correct_answer.is_empty() {
            return Err(QuestionError::EmptyAnswer);
        }

        let kind = match self.kind {
            QuestionKind::TextAnswer => QuestionKind::TextAnswer,
            QuestionKind::MultipleChoice { choices } => {
                let choices = non_blank_choices(choices);
                check_choice_answer(&choices, &correct_answer)?;
                QuestionKind::MultipleChoice { choices }
            }
        };

        Ok(ValidatedQuestion {
            text,
            kind,
            correct_answer,
            difficulty: self.difficulty,
        })
    }
}

fn non_blank_choices(choices: Vec<String>) -> Vec<String> {
    choices
        .into_iter()
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Checks the multiple-choice invariant for a finalized answer.
///
/// # Errors
///
/// Returns `QuestionError::TooFewChoices` or `QuestionError::AnswerNotInChoices`.
fn check_choice_answer(choices: &[String], answer: &str) -> Result<(), QuestionError> {
    if choices.len() < 2 {
        return Err(QuestionError::TooFewChoices {
            count: choices.len(),
        });
    }
    if !choices.iter().any(|c| c == answer) {
        return Err(QuestionError::AnswerNotInChoices {
            answer: answer.to_owned(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub text: String,
    pub kind: QuestionKind,
    pub correct_answer: String,
    pub difficulty: Difficulty,
}

impl ValidatedQuestion {
    pub fn assign_ids(self, id: QuestionId, batch_id: BatchId) -> Question {
        Question {
            id,
            batch_id,
            text: self.text,
            kind: self.kind,
            correct_answer: self.correct_answer,
            difficulty: self.difficulty,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub batch_id: BatchId,
    pub text: String,
    pub kind: QuestionKind,
    pub correct_answer: String,
    pub difficulty: Difficulty,
}

impl Question {
    /// Exact-match check used for scoring.
    #[must_use]
    pub fn is_correct(&self, given: &str) -> bool {
        self.correct_answer == given
    }

    /// Replace the correct answer, e.g. after the parser's first-choice
    /// placeholder has been reviewed.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyAnswer` for blank answers, and
    /// `QuestionError::AnswerNotInChoices` for multiple choice answers that do
    /// not match a choice.
    pub fn set_correct_answer(&mut self, answer: &str) -> Result<(), QuestionError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(QuestionError::EmptyAnswer);
        }
        if let QuestionKind::MultipleChoice { choices } = &self.kind {
            check_choice_answer(choices, answer)?;
        }
        answer.clone_into(&mut self.correct_answer);
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
