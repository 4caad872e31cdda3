use practice_core::model::{AnswerRecord, AnsweredSet, ItemId, LearnerId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{conn, map_answer_row, ser, u64_to_i64},
};
use crate::repository::{AnswerLogRepository, StorageError};

#[async_trait::async_trait]
impl AnswerLogRepository for SqliteRepository {
    async fn append_answer(&self, record: &AnswerRecord) -> Result<i64, StorageError> {
        let attempt = record
            .attempt_id
            .map(|a| u64_to_i64("attempt_id", a.value()))
            .transpose()?;

        let res = sqlx::query(
            r"
                INSERT INTO answer_logs (
                    learner_id, item_id, attempt_id, selected_answer, is_correct,
                    time_taken_secs, difficulty_at_time, answered_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(u64_to_i64("learner_id", record.learner_id.value())?)
        .bind(u64_to_i64("item_id", record.item_id.value())?)
        .bind(attempt)
        .bind(record.selected_answer.as_str())
        .bind(record.is_correct)
        .bind(record.time_taken_secs)
        .bind(record.difficulty_at_time.value())
        .bind(record.answered_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn answered_item_ids(&self, learner_id: LearnerId) -> Result<AnsweredSet, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT DISTINCT item_id
                FROM answer_logs
                WHERE learner_id = ?1
            ",
        )
        .bind(u64_to_i64("learner_id", learner_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut answered = AnsweredSet::new();
        for row in rows {
            let id: i64 = row.try_get("item_id").map_err(ser)?;
            let id = u64::try_from(id)
                .map_err(|_| StorageError::Serialization("item_id sign overflow".into()))?;
            answered.insert(ItemId::new(id));
        }
        Ok(answered)
    }

    async fn answers_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<AnswerRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, learner_id, item_id, attempt_id, selected_answer, is_correct,
                    time_taken_secs, difficulty_at_time, answered_at
                FROM answer_logs
                WHERE learner_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(u64_to_i64("learner_id", learner_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_answer_row(&row)?);
        }
        Ok(out)
    }

    async fn delete_answers_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM answer_logs WHERE learner_id = ?1")
            .bind(u64_to_i64("learner_id", learner_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
