use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use vocab_core::model::{Direction, ProgressKey, Word, WordId, WordProgress};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn word_id_to_i64(id: WordId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("word_id overflow".into()))
}

pub(crate) fn word_id_from_i64(v: i64) -> Result<WordId, StorageError> {
    u64::try_from(v)
        .map(WordId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid word_id: {v}")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_word_row(row: &SqliteRow) -> Result<Word, StorageError> {
    Ok(Word {
        id: word_id_from_i64(row.try_get("id").map_err(ser)?)?,
        source: row.try_get("source").map_err(ser)?,
        target: row.try_get("target").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<WordProgress, StorageError> {
    let word_id = word_id_from_i64(row.try_get("word_id").map_err(ser)?)?;
    let direction: Direction = row
        .try_get::<String, _>("direction")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    let last_review_at: Option<DateTime<Utc>> = row.try_get("last_review_at").map_err(ser)?;

    WordProgress::from_persisted(WordProgress {
        key: ProgressKey::new(word_id, direction),
        repetitions: u32_from_i64("repetitions", row.try_get("repetitions").map_err(ser)?)?,
        interval_days: row.try_get("interval_days").map_err(ser)?,
        ease_factor: row.try_get("ease_factor").map_err(ser)?,
        next_review_at: row.try_get("next_review_at").map_err(ser)?,
        last_review_at,
        is_selected: row.try_get("is_selected").map_err(ser)?,
        is_mastered: row.try_get("is_mastered").map_err(ser)?,
        learning_phase: row.try_get("learning_phase").map_err(ser)?,
        session_position: u32_from_i64(
            "session_position",
            row.try_get("session_position").map_err(ser)?,
        )?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
    .map_err(ser)
}
