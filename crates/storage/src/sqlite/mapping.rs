use quiz_core::model::{
    AnswerMap, Batch, BatchId, BatchSource, Difficulty, HistoryId, NewQuizHistory, Question,
    QuestionId, QuestionKind, QuizHistory,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn batch_id_from_i64(v: i64) -> Result<BatchId, StorageError> {
    Ok(BatchId::new(i64_to_u64("batch_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn history_id_from_i64(v: i64) -> Result<HistoryId, StorageError> {
    Ok(HistoryId::new(i64_to_u64("history_id", v)?))
}

/// Choices are stored as a JSON array, `NULL` for text questions.
pub(crate) fn choices_to_json(kind: &QuestionKind) -> Result<Option<String>, StorageError> {
    kind.choices()
        .map(|c| serde_json::to_string(c).map_err(ser))
        .transpose()
}

pub(crate) fn answers_to_json(answers: &AnswerMap) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn map_batch_row(row: &SqliteRow) -> Result<Batch, StorageError> {
    let source_tag: String = row.try_get("source").map_err(ser)?;
    let file_name: Option<String> = row.try_get("file_name").map_err(ser)?;
    let source = BatchSource::from_parts(&source_tag, file_name).map_err(ser)?;

    Batch::from_persisted(
        batch_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        source,
        row.try_get::<String, _>("content").map_err(ser)?,
        i64_to_u32("question_count", row.try_get("question_count").map_err(ser)?)?,
        i64_to_u32("question_limit", row.try_get("question_limit").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let tag: String = row.try_get("type").map_err(ser)?;
    let choices = row
        .try_get::<Option<String>, _>("choices")
        .map_err(ser)?
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw).map_err(ser))
        .transpose()?;
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Ok(Question {
        id: question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        batch_id: batch_id_from_i64(row.try_get::<i64, _>("batch_id").map_err(ser)?)?,
        text: row.try_get("question").map_err(ser)?,
        kind: QuestionKind::from_parts(&tag, choices).map_err(ser)?,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        difficulty,
    })
}

pub(crate) fn map_history_row(row: &SqliteRow) -> Result<QuizHistory, StorageError> {
    let answers: AnswerMap =
        serde_json::from_str(&row.try_get::<String, _>("answers").map_err(ser)?).map_err(ser)?;
    let time_taken = i64_to_u64("time_taken", row.try_get("time_taken").map_err(ser)?)?;

    let record = NewQuizHistory::new(
        batch_id_from_i64(row.try_get::<i64, _>("batch_id").map_err(ser)?)?,
        row.try_get::<String, _>("batch_title").map_err(ser)?,
        i64_to_u32("total_questions", row.try_get("total_questions").map_err(ser)?)?,
        i64_to_u32("correct_answers", row.try_get("correct_answers").map_err(ser)?)?,
        row.try_get("percentage").map_err(ser)?,
        time_taken,
        answers,
    )
    .map_err(ser)?;

    Ok(record.assign_id(
        history_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    ))
}
