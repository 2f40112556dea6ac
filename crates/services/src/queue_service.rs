use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use storage::repository::{ProgressRepository, WordRepository};
use vocab_core::{
    QueueBuilder, QueueCounts, StudyConfig, StudyQueue,
    model::{Direction, ProgressKey, WordId, WordProgress, WordWithProgress},
    time::Clock,
};

use crate::error::QueueServiceError;

/// Builds study queues from the current store contents.
///
/// Nothing is cached: every call reads a fresh snapshot, so a queue always
/// reflects the latest answers.
#[derive(Clone)]
pub struct QueueService {
    clock: Clock,
    builder: QueueBuilder,
    daily_goal: u32,
    new_word_cap: u32,
    new_word_seed: Option<u64>,
    words: Arc<dyn WordRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl QueueService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: &StudyConfig,
        words: Arc<dyn WordRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            builder: QueueBuilder::new(config.queue.clone()),
            daily_goal: config.daily_goal,
            new_word_cap: config.new_word_cap,
            new_word_seed: None,
            words,
            progress,
        }
    }

    /// Shuffle first exposures with an RNG seeded from `seed`.
    ///
    /// The same seed over the same snapshot yields the same order.
    #[must_use]
    pub fn with_new_word_shuffle(mut self, seed: u64) -> Self {
        self.new_word_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Ordered queue for `direction` right now.
    ///
    /// # Errors
    ///
    /// Returns `QueueServiceError::Storage` if records cannot be loaded.
    pub async fn build_queue(&self, direction: Direction) -> Result<StudyQueue, QueueServiceError> {
        let (_, queue) = self.snapshot(direction).await?;
        Ok(queue)
    }

    /// The next `limit` words to study in `direction`, joined with their
    /// progress records.
    ///
    /// # Errors
    ///
    /// Returns `QueueServiceError::Storage` if records or words cannot be loaded.
    pub async fn get_queue(
        &self,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<WordWithProgress>, QueueServiceError> {
        let (records, mut queue) = self.snapshot(direction).await?;
        queue.truncate(limit);
        if queue.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<WordId> = queue.entries().iter().map(|e| e.key.word_id).collect();
        let words = self.words.get_words(&ids).await?;

        let mut by_key: HashMap<ProgressKey, WordProgress> =
            records.into_iter().map(|p| (p.key, p)).collect();
        Ok(words
            .into_iter()
            .zip(queue.entries())
            .filter_map(|(word, entry)| {
                by_key
                    .remove(&entry.key)
                    .map(|progress| WordWithProgress { word, progress })
            })
            .collect())
    }

    /// Backlog counts for `direction`, ignoring the daily goal.
    ///
    /// # Errors
    ///
    /// Returns `QueueServiceError::Storage` if records cannot be loaded.
    pub async fn get_counts(&self, direction: Direction) -> Result<QueueCounts, QueueServiceError> {
        let records = self.progress.load_all(direction).await?;
        Ok(self.builder.counts(&records, self.clock.now()))
    }

    async fn snapshot(
        &self,
        direction: Direction,
    ) -> Result<(Vec<WordProgress>, StudyQueue), QueueServiceError> {
        let now = self.clock.now();
        let records = self.progress.load_all(direction).await?;

        let queue = match self.new_word_seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                self.builder.build_with(
                    &records,
                    now,
                    self.daily_goal,
                    self.new_word_cap,
                    |new| new.shuffle(&mut rng),
                )
            }
            None => self
                .builder
                .build(&records, now, self.daily_goal, self.new_word_cap),
        };

        debug!(
            "Built {direction} queue: {} entries, {} studied today, {} left in goal",
            queue.len(),
            queue.studied_today(),
            queue.remaining_goal()
        );
        if queue.is_goal_reached() {
            warn!(
                "Daily goal of {} reached for {direction}; queue is empty",
                self.daily_goal
            );
        }
        Ok((records, queue))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
