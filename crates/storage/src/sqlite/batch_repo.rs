use std::fmt::Write as _;

use quiz_core::model::{Batch, BatchId, Question, QuestionId, ValidatedBatch, ValidatedQuestion};

use super::SqliteRepository;
use super::mapping::{
    batch_id_from_i64, choices_to_json, conn, id_i64, map_batch_row, map_question_row,
    question_id_from_i64,
};
use crate::repository::{BatchRepository, StorageError};

const BATCH_COLUMNS: &str =
    "id, title, source, file_name, content, question_count, question_limit, created_at";

const QUESTION_COLUMNS: &str =
    "id, batch_id, question, type, choices, correct_answer, difficulty";

#[async_trait::async_trait]
impl BatchRepository for SqliteRepository {
    async fn create_batch(
        &self,
        batch: ValidatedBatch,
        questions: Vec<ValidatedQuestion>,
    ) -> Result<(Batch, Vec<Question>), StorageError> {
        let count = u32::try_from(questions.len())
            .map_err(|_| StorageError::Serialization("question count overflow".into()))?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO batches (title, source, file_name, content, question_count, question_limit, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(&batch.title)
        .bind(batch.source.as_str())
        .bind(batch.source.file_name())
        .bind(&batch.source_content)
        .bind(i64::from(count))
        .bind(i64::from(batch.question_limit))
        .bind(batch.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let batch_id = batch_id_from_i64(res.last_insert_rowid())?;
        let batch_key = id_i64("batch_id", batch_id.value())?;

        let mut stored = Vec::with_capacity(questions.len());
        for (position, question) in questions.into_iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            let res = sqlx::query(
                r"
                INSERT INTO questions (batch_id, position, question, type, choices, correct_answer, difficulty)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(batch_key)
            .bind(position)
            .bind(&question.text)
            .bind(question.kind.type_str())
            .bind(choices_to_json(&question.kind)?)
            .bind(&question.correct_answer)
            .bind(question.difficulty.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            let id = question_id_from_i64(res.last_insert_rowid())?;
            stored.push(question.assign_ids(id, batch_id));
        }

        tx.commit().await.map_err(conn)?;

        Ok((batch.assign_id(batch_id, count), stored))
    }

    async fn list_batches(&self) -> Result<Vec<Batch>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_batch_row).collect()
    }

    async fn get_batch(&self, id: BatchId) -> Result<Option<Batch>, StorageError> {
        let row = sqlx::query(&format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1"))
            .bind(id_i64("batch_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_batch_row).transpose()
    }

    async fn get_questions(&self, batch_id: BatchId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE batch_id = ?1 ORDER BY position ASC, id ASC"
        ))
        .bind(id_i64("batch_id", batch_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"
        ))
        .bind(id_i64("question_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn update_correct_answer(
        &self,
        id: QuestionId,
        answer: &str,
    ) -> Result<bool, StorageError> {
        let res = sqlx::query("UPDATE questions SET correct_answer = ?1 WHERE id = ?2")
            .bind(answer)
            .bind(id_i64("question_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }

    async fn delete_batches(&self, ids: &[BatchId]) -> Result<u64, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut sql = String::from("DELETE FROM batches WHERE id IN (");
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            // writing to a String cannot fail
            let _ = write!(sql, "?{}", i + 1);
        }
        sql.push(')');

        let mut q = sqlx::query(&sql);
        for id in ids {
            q = q.bind(id_i64("batch_id", id.value())?);
        }

        // questions and quiz_histories go with their batch via ON DELETE CASCADE
        let res = q.execute(&self.pool).await.map_err(conn)?;
        Ok(res.rows_affected())
    }
}
