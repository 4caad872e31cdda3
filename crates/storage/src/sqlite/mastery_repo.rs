use practice_core::model::{LearnerId, MasteryKey, MasteryNode};

use super::{
    SqliteRepository,
    mapping::{conn, map_node_row, subject_key, u64_to_i64},
};
use crate::repository::{MasteryRepository, StorageError};

const NODE_COLUMNS: &str = r"
    learner_id, topic, subject_key, strength, volatility, last_updated, revision
";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait::async_trait]
impl MasteryRepository for SqliteRepository {
    async fn get_node(&self, key: &MasteryKey) -> Result<Option<MasteryNode>, StorageError> {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM mastery_nodes
             WHERE learner_id = ?1 AND topic = ?2 AND subject_key = ?3"
        );
        let row = sqlx::query(&sql)
            .bind(u64_to_i64("learner_id", key.learner_id.value())?)
            .bind(key.topic.as_str())
            .bind(subject_key(key.subject)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_node_row).transpose()
    }

    async fn upsert_node(&self, node: &MasteryNode) -> Result<(), StorageError> {
        let revision = u64_to_i64("revision", node.revision())?;
        if revision < 1 {
            return Err(StorageError::Conflict);
        }
        let learner = u64_to_i64("learner_id", node.learner_id().value())?;
        let subject = subject_key(node.subject())?;

        let affected = if revision == 1 {
            let res = sqlx::query(
                r"
                    INSERT INTO mastery_nodes (
                        learner_id, topic, subject_key, strength, volatility, last_updated, revision
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(learner)
            .bind(node.topic().as_str())
            .bind(subject)
            .bind(node.strength().value())
            .bind(node.volatility())
            .bind(node.last_updated())
            .bind(revision)
            .execute(&self.pool)
            .await;
            match res {
                Ok(done) => done.rows_affected(),
                Err(e) if is_unique_violation(&e) => 0,
                Err(e) => return Err(conn(e)),
            }
        } else {
            sqlx::query(
                r"
                    UPDATE mastery_nodes
                    SET strength = ?4, volatility = ?5, last_updated = ?6, revision = ?7
                    WHERE learner_id = ?1 AND topic = ?2 AND subject_key = ?3
                      AND revision = ?7 - 1
                ",
            )
            .bind(learner)
            .bind(node.topic().as_str())
            .bind(subject)
            .bind(node.strength().value())
            .bind(node.volatility())
            .bind(node.last_updated())
            .bind(revision)
            .execute(&self.pool)
            .await
            .map_err(conn)?
            .rows_affected()
        };

        if affected == 0 {
            tracing::warn!(
                learner_id = %node.learner_id(),
                topic = %node.topic(),
                revision,
                "mastery node revision conflict"
            );
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn nodes_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<MasteryNode>, StorageError> {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM mastery_nodes
             WHERE learner_id = ?1
             ORDER BY topic ASC, subject_key ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(u64_to_i64("learner_id", learner_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_node_row(&row)?);
        }
        Ok(out)
    }

    async fn delete_nodes_for_learner(&self, learner_id: LearnerId) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM mastery_nodes WHERE learner_id = ?1")
            .bind(u64_to_i64("learner_id", learner_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
