use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the item bank, answer log and mastery graph.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS items (
                    id INTEGER PRIMARY KEY,
                    topic TEXT NOT NULL,
                    subject_id INTEGER,
                    subtopic TEXT,
                    difficulty REAL NOT NULL CHECK (difficulty >= 0.0 AND difficulty <= 1.0),
                    content TEXT NOT NULL,
                    options TEXT NOT NULL,
                    correct_answer TEXT NOT NULL,
                    explanation TEXT,
                    pyq_year INTEGER,
                    weight REAL NOT NULL CHECK (weight > 0.0)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS answer_logs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    learner_id INTEGER NOT NULL,
                    item_id INTEGER NOT NULL,
                    attempt_id INTEGER,
                    selected_answer TEXT NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    time_taken_secs REAL NOT NULL CHECK (time_taken_secs >= 0.0),
                    difficulty_at_time REAL NOT NULL,
                    answered_at TEXT NOT NULL,
                    FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // subject_key is -1 for subject-less nodes so the primary key stays total.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS mastery_nodes (
                    learner_id INTEGER NOT NULL,
                    topic TEXT NOT NULL,
                    subject_key INTEGER NOT NULL,
                    strength REAL NOT NULL CHECK (strength >= 0.0 AND strength <= 1.0),
                    volatility REAL NOT NULL,
                    last_updated TEXT NOT NULL,
                    revision INTEGER NOT NULL CHECK (revision >= 1),
                    PRIMARY KEY (learner_id, topic, subject_key)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_items_topic_difficulty
                    ON items (topic, difficulty, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_answer_logs_learner_item
                    ON answer_logs (learner_id, item_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
