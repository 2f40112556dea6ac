use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use storage::repository::{ProgressRepository, StorageError, WordRepository};
use vocab_core::{
    Scheduler,
    model::{Direction, ProgressKey, Quality, Word, WordDraft, WordId, WordProgress},
    scheduler::ScheduledStates,
    time::Clock,
};

use crate::error::ProgressServiceError;

fn record_error(key: ProgressKey) -> impl FnOnce(StorageError) -> ProgressServiceError {
    move |err| match err {
        StorageError::NotFound => ProgressServiceError::NotFound(key),
        other => ProgressServiceError::Storage(other),
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Applies answers and explicit overrides to stored progress records.
///
/// Every write goes through `ProgressRepository::modify`, so concurrent
/// answers on the same record serialize at the store.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    scheduler: Scheduler,
    words: Arc<dyn WordRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        scheduler: Scheduler,
        words: Arc<dyn WordRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            scheduler,
            words,
            progress,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Apply an answer to one (word, direction) record and persist it.
    ///
    /// Mastered records come back unchanged. The other direction of the
    /// word is never touched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` if the record does not exist,
    /// or `ProgressServiceError::Storage` if the store fails.
    pub async fn update_progress(
        &self,
        key: ProgressKey,
        quality: Quality,
    ) -> Result<WordProgress, ProgressServiceError> {
        let now = self.clock.now();
        let scheduler = &self.scheduler;
        let updated = self
            .progress
            .modify(key, &|current| scheduler.update(&current, quality, now))
            .await
            .map_err(record_error(key))?;

        debug!(
            "Answered {key} with {quality:?}: reps={}, interval={:.2}d, ease={:.2}, next={}",
            updated.repetitions,
            updated.interval_days,
            updated.ease_factor,
            updated.next_review_at
        );
        if updated.is_mastered {
            debug!("{key} is mastered");
        }
        Ok(updated)
    }

    /// Same as [`Self::update_progress`], validating a numeric quality code
    /// (`1..=3`) first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::InvalidQuality` for codes outside `1..=3`;
    /// nothing is written in that case.
    pub async fn update_progress_raw(
        &self,
        key: ProgressKey,
        quality_code: u8,
    ) -> Result<WordProgress, ProgressServiceError> {
        let quality = Quality::from_u8(quality_code)?;
        self.update_progress(key, quality).await
    }

    /// What each answer would produce for the stored record, without writing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` if the record does not exist.
    pub async fn preview(&self, key: ProgressKey) -> Result<ScheduledStates, ProgressServiceError> {
        let current = self
            .progress
            .load_one(key)
            .await?
            .ok_or(ProgressServiceError::NotFound(key))?;
        Ok(self.scheduler.preview(&current, self.clock.now()))
    }

    /// Put a record back at the start of the learning phase.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` if the record does not exist.
    pub async fn reset_progress(
        &self,
        key: ProgressKey,
    ) -> Result<WordProgress, ProgressServiceError> {
        let now = self.clock.now();
        let scheduler = &self.scheduler;
        let updated = self
            .progress
            .modify(key, &|current| scheduler.reset(&current, now))
            .await
            .map_err(record_error(key))?;
        info!("Reset progress for {key}");
        Ok(updated)
    }

    /// Set or clear the mastered flag of one record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` if the record does not exist.
    pub async fn mark_mastered(
        &self,
        key: ProgressKey,
        mastered: bool,
    ) -> Result<WordProgress, ProgressServiceError> {
        let now = self.clock.now();
        let scheduler = &self.scheduler;
        let updated = self
            .progress
            .modify(key, &|current| scheduler.set_mastered(&current, mastered, now))
            .await
            .map_err(record_error(key))?;
        info!("Marked {key} mastered={mastered}");
        Ok(updated)
    }

    /// Insert a new word and select it for study in both directions.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::InvalidWord` for blank text, or storage
    /// errors.
    pub async fn add_word(
        &self,
        source: &str,
        target: &str,
    ) -> Result<(Word, [WordProgress; 2]), ProgressServiceError> {
        let now = self.clock.now();
        let validated = WordDraft::new(source, target).validate(now)?;
        let word = self.words.insert_word(&validated).await?;
        let pair = self.select_word(word.id).await?;
        Ok((word, pair))
    }

    /// Select a word for study. Creates both direction records the first
    /// time; re-selecting a deselected word keeps its history.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::WordNotFound` if the word does not exist.
    pub async fn select_word(
        &self,
        word_id: WordId,
    ) -> Result<[WordProgress; 2], ProgressServiceError> {
        if self.words.get_word(word_id).await?.is_none() {
            return Err(ProgressServiceError::WordNotFound(word_id));
        }

        let now = self.clock.now();
        let pair = WordProgress::new_pair(word_id, self.scheduler.config().initial_ease, now);
        match self.progress.insert_pair(&pair).await {
            Ok(()) => {
                info!("Selected word {word_id} in both directions");
                Ok(pair)
            }
            Err(StorageError::Conflict) => {
                let [first, second] = pair.map(|p| p.key);
                let first = self.set_selected(first, true, now).await?;
                let second = self.set_selected(second, true, now).await?;
                info!("Re-selected word {word_id}");
                Ok([first, second])
            }
            Err(StorageError::NotFound) => Err(ProgressServiceError::WordNotFound(word_id)),
            Err(other) => Err(other.into()),
        }
    }

    /// Take a word out of study in both directions, keeping its progress.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` if the word was never selected.
    pub async fn deselect_word(
        &self,
        word_id: WordId,
    ) -> Result<[WordProgress; 2], ProgressServiceError> {
        let now = self.clock.now();
        let [first, second] = Direction::ALL.map(|d| ProgressKey::new(word_id, d));
        let first = self.set_selected(first, false, now).await?;
        let second = self.set_selected(second, false, now).await?;
        info!("Deselected word {word_id}");
        Ok([first, second])
    }

    /// Delete a word together with both of its progress records.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::WordNotFound` if the word does not exist.
    pub async fn remove_word(&self, word_id: WordId) -> Result<(), ProgressServiceError> {
        if !self.words.remove_word(word_id).await? {
            return Err(ProgressServiceError::WordNotFound(word_id));
        }
        info!("Removed word {word_id}");
        Ok(())
    }

    async fn set_selected(
        &self,
        key: ProgressKey,
        selected: bool,
        now: DateTime<Utc>,
    ) -> Result<WordProgress, ProgressServiceError> {
        self.progress
            .modify(key, &|current| WordProgress {
                is_selected: selected,
                updated_at: now,
                ..current
            })
            .await
            .map_err(record_error(key))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
