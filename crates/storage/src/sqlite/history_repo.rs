use chrono::{DateTime, Utc};
use quiz_core::model::{NewQuizHistory, QuizHistory};

use super::SqliteRepository;
use super::mapping::{answers_to_json, conn, history_id_from_i64, id_i64, map_history_row};
use crate::repository::{QuizHistoryRepository, StorageError};

#[async_trait::async_trait]
impl QuizHistoryRepository for SqliteRepository {
    async fn append_history(
        &self,
        record: NewQuizHistory,
        created_at: DateTime<Utc>,
    ) -> Result<QuizHistory, StorageError> {
        let time_taken = i64::try_from(record.time_taken_secs())
            .map_err(|_| StorageError::Serialization("time_taken overflow".into()))?;

        let res = sqlx::query(
            r"
            INSERT INTO quiz_histories (
                batch_id, batch_title, total_questions, correct_answers,
                percentage, time_taken, answers, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_i64("batch_id", record.batch_id().value())?)
        .bind(record.batch_title())
        .bind(i64::from(record.total_questions()))
        .bind(i64::from(record.correct_answers()))
        .bind(record.percentage())
        .bind(time_taken)
        .bind(answers_to_json(record.answers())?)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            other => conn(other),
        })?;

        let id = history_id_from_i64(res.last_insert_rowid())?;
        Ok(record.assign_id(id, created_at))
    }

    async fn list_history(&self) -> Result<Vec<QuizHistory>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, batch_id, batch_title, total_questions, correct_answers,
                   percentage, time_taken, answers, created_at
            FROM quiz_histories
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_history_row).collect()
    }
}
