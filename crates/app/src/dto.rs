//! JSON shapes exchanged with the quiz client.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quiz_core::model::{
    AnswerMap, Batch, BatchId, Difficulty, Question, QuestionDraft, QuestionError, QuestionId,
    QuestionKind, QuizHistory,
};
use services::{AnswerUpdate, BatchWithQuestions};

use crate::error::AppError;

//
// ─── EXTRACTORS ────────────────────────────────────────────────────────────────
//

/// JSON body whose rejections answer like every other validation error.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path parameters with the same rejection shape as [`AppJson`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Serialize)]
pub struct QuestionDto {
    pub id: u64,
    pub pdf_module_id: u64,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub choices: Option<Vec<String>>,
    pub correct_answer: String,
    /// Older clients read `answer`; it always mirrors `correct_answer`.
    pub answer: String,
    pub difficulty: Difficulty,
}

impl From<&Question> for QuestionDto {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.value(),
            pdf_module_id: q.batch_id.value(),
            question: q.text.clone(),
            kind: q.kind.type_str(),
            choices: q.kind.choices().map(<[String]>::to_vec),
            correct_answer: q.correct_answer.clone(),
            answer: q.correct_answer.clone(),
            difficulty: q.difficulty,
        }
    }
}

#[must_use]
pub fn questions_to_dto(questions: &[Question]) -> Vec<QuestionDto> {
    questions.iter().map(QuestionDto::from).collect()
}

/// A batch as the client knows it ("module").
#[derive(Debug, Clone, Serialize)]
pub struct ModuleDto {
    pub id: u64,
    pub title: String,
    pub file_path: String,
    pub source: &'static str,
    pub content: String,
    pub question_count: u32,
    pub question_limit: u32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuestionDto>>,
}

impl From<&Batch> for ModuleDto {
    fn from(b: &Batch) -> Self {
        Self {
            id: b.id().value(),
            title: b.title().to_owned(),
            file_path: b.source().file_path(),
            source: b.source().as_str(),
            content: b.source_content().to_owned(),
            question_count: b.question_count(),
            question_limit: b.question_limit(),
            created_at: b.created_at(),
            questions: None,
        }
    }
}

impl From<&BatchWithQuestions> for ModuleDto {
    fn from(item: &BatchWithQuestions) -> Self {
        Self {
            questions: Some(questions_to_dto(&item.questions)),
            ..ModuleDto::from(&item.batch)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummaryDto {
    pub id: u64,
    pub title: String,
    pub question_count: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&Batch> for BatchSummaryDto {
    fn from(b: &Batch) -> Self {
        Self {
            id: b.id().value(),
            title: b.title().to_owned(),
            question_count: b.question_count(),
            created_at: b.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryDto {
    pub id: u64,
    pub pdf_module_id: u64,
    pub batch_title: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub percentage: f64,
    pub time_taken: u64,
    pub answers: AnswerMap,
    pub created_at: DateTime<Utc>,
    /// The batch the attempt was taken on, when it was looked up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_module: Option<BatchSummaryDto>,
}

impl HistoryDto {
    #[must_use]
    pub fn new(h: &QuizHistory, batch: Option<&Batch>) -> Self {
        Self {
            id: h.id().value(),
            pdf_module_id: h.batch_id().value(),
            batch_title: h.batch_title().to_owned(),
            total_questions: h.total_questions(),
            correct_answers: h.correct_answers(),
            percentage: h.percentage(),
            time_taken: h.time_taken_secs(),
            answers: h.answers().clone(),
            created_at: h.created_at(),
            pdf_module: batch.map(BatchSummaryDto::from),
        }
    }
}

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewedAnswer {
    pub id: u64,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveBatchRequest {
    pub title: String,
    pub questions: Vec<ReviewedAnswer>,
}

impl SaveBatchRequest {
    #[must_use]
    pub fn updates(&self) -> Vec<AnswerUpdate> {
        self.questions
            .iter()
            .map(|q| AnswerUpdate {
                question_id: QuestionId::new(q.id),
                correct_answer: q.correct_answer.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManualQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl ManualQuestion {
    /// A missing difficulty means medium. Choices sent with a text question
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for an unknown type or difficulty.
    pub fn into_draft(self) -> Result<QuestionDraft, QuestionError> {
        let kind = QuestionKind::from_parts(self.kind.trim(), self.choices)?;
        let difficulty = match self.difficulty.as_deref().map(str::trim) {
            None | Some("") => Difficulty::default(),
            Some(value) => value.parse()?,
        };
        Ok(QuestionDraft {
            text: self.question,
            kind,
            correct_answer: self.correct_answer,
            difficulty,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateManualRequest {
    pub title: String,
    pub questions: Vec<ManualQuestion>,
    #[serde(default)]
    pub question_limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveHistoryRequest {
    pub pdf_module_id: u64,
    pub batch_title: String,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub percentage: f64,
    pub time_taken: u64,
    #[serde(default)]
    pub answers: AnswerMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteBatchesRequest {
    pub batch_ids: Vec<u64>,
}

impl DeleteBatchesRequest {
    #[must_use]
    pub fn ids(&self) -> Vec<BatchId> {
        self.batch_ids.iter().copied().map(BatchId::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_serializes_with_wire_names() {
        let q = Question {
            id: QuestionId::new(4),
            batch_id: BatchId::new(2),
            text: "Pick one".into(),
            kind: QuestionKind::MultipleChoice {
                choices: vec!["A".into(), "B".into()],
            },
            correct_answer: "A".into(),
            difficulty: Difficulty::Medium,
        };
        let value = serde_json::to_value(QuestionDto::from(&q)).unwrap();
        assert_eq!(value["type"], "multiple_choice");
        assert_eq!(value["choices"], json!(["A", "B"]));
        assert_eq!(value["pdf_module_id"], 2);
        assert_eq!(value["difficulty"], "medium");
        assert_eq!(value["answer"], "A");
    }

    #[test]
    fn manual_question_defaults_to_medium() {
        let raw: ManualQuestion = serde_json::from_value(json!({
            "question": "2 + 2?",
            "type": "multiple_choice",
            "choices": ["3", "4"],
            "correct_answer": "4"
        }))
        .unwrap();
        let draft = raw.into_draft().unwrap();
        assert_eq!(draft.kind.choices(), Some(&["3".to_owned(), "4".to_owned()][..]));
        assert_eq!(draft.difficulty, Difficulty::Medium);
    }

    #[test]
    fn text_question_drops_stray_choices() {
        let raw: ManualQuestion = serde_json::from_value(json!({
            "question": "Capital of Italy?",
            "type": "text",
            "choices": ["Rome", "Milan"],
            "correct_answer": "Rome",
            "difficulty": "hard"
        }))
        .unwrap();
        let draft = raw.into_draft().unwrap();
        assert_eq!(draft.kind, QuestionKind::TextAnswer);
        assert_eq!(draft.difficulty, Difficulty::Hard);
    }

    #[test]
    fn manual_question_rejects_unknown_type() {
        let raw: ManualQuestion = serde_json::from_value(json!({
            "question": "?",
            "type": "essay",
            "correct_answer": "x"
        }))
        .unwrap();
        assert_eq!(
            raw.into_draft(),
            Err(QuestionError::UnknownKind("essay".into()))
        );
    }

    #[test]
    fn history_request_reads_string_keyed_answers() {
        let req: SaveHistoryRequest = serde_json::from_value(json!({
            "pdf_module_id": 1,
            "batch_title": "Capitals",
            "total_questions": 2,
            "correct_answers": 1,
            "percentage": 50.0,
            "time_taken": 30,
            "answers": {"0": "Paris", "1": "Rome"}
        }))
        .unwrap();
        assert_eq!(req.answers.get(&1).map(String::as_str), Some("Rome"));
    }
}
