use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies pending schema versions, each inside its own transaction.
///
/// Version 1 creates words, per-direction progress with cascading deletes,
/// and the due-date index used by queue loading.
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

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS words (
                    id INTEGER PRIMARY KEY,
                    source TEXT NOT NULL,
                    target TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS word_progress (
                    word_id INTEGER NOT NULL,
                    direction TEXT NOT NULL
                        CHECK (direction IN ('source_to_target', 'target_to_source')),
                    repetitions INTEGER NOT NULL CHECK (repetitions >= 0),
                    interval_days REAL NOT NULL CHECK (interval_days >= 0),
                    ease_factor REAL NOT NULL CHECK (ease_factor >= 1.3),
                    next_review_at TEXT NOT NULL,
                    last_review_at TEXT,
                    is_selected INTEGER NOT NULL,
                    is_mastered INTEGER NOT NULL,
                    learning_phase INTEGER NOT NULL,
                    session_position INTEGER NOT NULL CHECK (session_position >= 0),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (word_id, direction),
                    FOREIGN KEY (word_id) REFERENCES words(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_word_progress_direction_next_review
                    ON word_progress (direction, next_review_at);
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
    }

    Ok(())
}
