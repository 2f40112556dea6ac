use std::collections::HashMap;

use vocab_core::model::{ValidatedWord, Word, WordId};

use super::SqliteRepository;
use super::mapping::{conn, map_word_row, word_id_from_i64, word_id_to_i64};
use crate::repository::{StorageError, WordRepository};

/// Ids bound per `IN (...)` query; below every `SQLite` variable limit.
const IN_LIST_CHUNK: usize = 500;

#[async_trait::async_trait]
impl WordRepository for SqliteRepository {
    async fn insert_word(&self, word: &ValidatedWord) -> Result<Word, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO words (source, target, created_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(&word.source)
        .bind(&word.target)
        .bind(word.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = word_id_from_i64(res.last_insert_rowid())?;
        Ok(word.clone().assign_id(id))
    }

    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO words (id, source, target, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                source = excluded.source,
                target = excluded.target
            ",
        )
        .bind(word_id_to_i64(word.id)?)
        .bind(&word.source)
        .bind(&word.target)
        .bind(word.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        let row = sqlx::query("SELECT id, source, target, created_at FROM words WHERE id = ?1")
            .bind(word_id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_word_row).transpose()
    }

    async fn get_words(&self, ids: &[WordId]) -> Result<Vec<Word>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<WordId, Word> = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(IN_LIST_CHUNK) {
            let placeholders = (1..=chunk.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT id, source, target, created_at FROM words WHERE id IN ({placeholders})"
            );

            let mut q = sqlx::query(&sql);
            for id in chunk {
                q = q.bind(word_id_to_i64(*id)?);
            }

            for row in q.fetch_all(&self.pool).await.map_err(conn)? {
                let word = map_word_row(&row)?;
                by_id.insert(word.id, word);
            }
        }

        // Duplicate ids in the request get a clone of the same row.
        ids.iter()
            .map(|id| by_id.get(id).cloned().ok_or(StorageError::NotFound))
            .collect()
    }

    async fn list_words(&self, limit: u32) -> Result<Vec<Word>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, source, target, created_at
            FROM words
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_word_row).collect()
    }

    async fn remove_word(&self, id: WordId) -> Result<bool, StorageError> {
        // word_progress rows go with it through ON DELETE CASCADE.
        let res = sqlx::query("DELETE FROM words WHERE id = ?1")
            .bind(word_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        Ok(res.rows_affected() > 0)
    }
}
