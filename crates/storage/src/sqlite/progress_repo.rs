use sqlx::{Executor, Sqlite};
use vocab_core::model::{Direction, ProgressKey, WordProgress};

use super::SqliteRepository;
use super::mapping::{conn, map_progress_row, word_id_to_i64};
use crate::repository::{ProgressRepository, ProgressUpdate, StorageError};

const SELECT_PROGRESS: &str = r"
    SELECT
        word_id, direction, repetitions, interval_days, ease_factor, next_review_at,
        last_review_at, is_selected, is_mastered, learning_phase, session_position,
        created_at, updated_at
    FROM word_progress
";

async fn write_progress<'e, E>(executor: E, p: &WordProgress) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r"
        INSERT INTO word_progress (
            word_id, direction, repetitions, interval_days, ease_factor, next_review_at,
            last_review_at, is_selected, is_mastered, learning_phase, session_position,
            created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(word_id, direction) DO UPDATE SET
            -- created_at stays with the first selection
            repetitions = excluded.repetitions,
            interval_days = excluded.interval_days,
            ease_factor = excluded.ease_factor,
            next_review_at = excluded.next_review_at,
            last_review_at = excluded.last_review_at,
            is_selected = excluded.is_selected,
            is_mastered = excluded.is_mastered,
            learning_phase = excluded.learning_phase,
            session_position = excluded.session_position,
            updated_at = excluded.updated_at
        ",
    )
    .bind(word_id_to_i64(p.word_id())?)
    .bind(p.direction().as_str())
    .bind(i64::from(p.repetitions))
    .bind(p.interval_days)
    .bind(p.ease_factor)
    .bind(p.next_review_at)
    .bind(p.last_review_at)
    .bind(p.is_selected)
    .bind(p.is_mastered)
    .bind(p.learning_phase)
    .bind(i64::from(p.session_position))
    .bind(p.created_at)
    .bind(p.updated_at)
    .execute(executor)
    .await
    .map_err(conn)?;

    Ok(())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_all(&self, direction: Direction) -> Result<Vec<WordProgress>, StorageError> {
        let sql = format!("{SELECT_PROGRESS} WHERE direction = ?1 ORDER BY word_id ASC");
        let rows = sqlx::query(&sql)
            .bind(direction.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn load_one(&self, key: ProgressKey) -> Result<Option<WordProgress>, StorageError> {
        let sql = format!("{SELECT_PROGRESS} WHERE word_id = ?1 AND direction = ?2");
        let row = sqlx::query(&sql)
            .bind(word_id_to_i64(key.word_id)?)
            .bind(key.direction.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn save(&self, progress: &WordProgress) -> Result<(), StorageError> {
        write_progress(&self.pool, progress).await
    }

    async fn insert_pair(&self, pair: &[WordProgress; 2]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        for p in pair {
            let res = sqlx::query(
                r"
                INSERT INTO word_progress (
                    word_id, direction, repetitions, interval_days, ease_factor, next_review_at,
                    last_review_at, is_selected, is_mastered, learning_phase, session_position,
                    created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                ",
            )
            .bind(word_id_to_i64(p.word_id())?)
            .bind(p.direction().as_str())
            .bind(i64::from(p.repetitions))
            .bind(p.interval_days)
            .bind(p.ease_factor)
            .bind(p.next_review_at)
            .bind(p.last_review_at)
            .bind(p.is_selected)
            .bind(p.is_mastered)
            .bind(p.learning_phase)
            .bind(i64::from(p.session_position))
            .bind(p.created_at)
            .bind(p.updated_at)
            .execute(&mut *tx)
            .await;

            match res {
                Ok(_) => {}
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    return Err(StorageError::Conflict);
                }
                Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                    return Err(StorageError::NotFound);
                }
                Err(e) => return Err(conn(e)),
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn modify(
        &self,
        key: ProgressKey,
        update: ProgressUpdate<'_>,
    ) -> Result<WordProgress, StorageError> {
        let word_id = word_id_to_i64(key.word_id)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        // Take the write lock before reading so a concurrent modify waits
        // instead of working from a stale snapshot.
        let touched = sqlx::query(
            "UPDATE word_progress SET updated_at = updated_at WHERE word_id = ?1 AND direction = ?2",
        )
        .bind(word_id)
        .bind(key.direction.as_str())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        if touched.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let sql = format!("{SELECT_PROGRESS} WHERE word_id = ?1 AND direction = ?2");
        let row = sqlx::query(&sql)
            .bind(word_id)
            .bind(key.direction.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(conn)?;
        let current = map_progress_row(&row)?;

        let next = update(current);
        if next.key != key {
            return Err(StorageError::Conflict);
        }
        write_progress(&mut *tx, &next).await?;

        tx.commit().await.map_err(conn)?;
        Ok(next)
    }
}
