use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{Direction, ProgressKey, WordId};
use crate::model::word::Word;

/// Lowest ease factor any record may carry.
pub const EASE_FLOOR: f64 = 1.3;

/// Ease factor assigned to freshly selected words.
pub const DEFAULT_EASE: f64 = 2.5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Raised when a persisted record violates a progress invariant.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("interval must be finite and >= 0, got {0}")]
    InvalidInterval(f64),

    #[error("ease factor must be finite and >= 1.3, got {0}")]
    InvalidEase(f64),

    #[error("updated_at is before created_at")]
    InvalidTimeRange,
}

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle stage of a single (word, direction) stream.
///
/// `New → Learning → Review → (Lapse → Learning) | Mastered`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyStage {
    New,
    Learning,
    Review,
    Mastered,
}

//
// ─── WORD PROGRESS ─────────────────────────────────────────────────────────────
//

/// Scheduling state for one word in one direction.
///
/// Plain data: the scheduler produces new values of this type, storage
/// adapters persist them, and nothing else mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordProgress {
    pub key: ProgressKey,
    pub repetitions: u32,
    pub interval_days: f64,
    pub ease_factor: f64,
    pub next_review_at: DateTime<Utc>,
    pub last_review_at: Option<DateTime<Utc>>,
    pub is_selected: bool,
    pub is_mastered: bool,
    pub learning_phase: bool,
    pub session_position: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WordProgress {
    /// A fresh, selected, never-reviewed record that is due immediately.
    #[must_use]
    pub fn new(key: ProgressKey, ease_factor: f64, now: DateTime<Utc>) -> Self {
        Self {
            key,
            repetitions: 0,
            interval_days: 0.0,
            ease_factor: ease_factor.max(EASE_FLOOR),
            next_review_at: now,
            last_review_at: None,
            is_selected: true,
            is_mastered: false,
            learning_phase: true,
            session_position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Both direction records for a word, created together at selection time.
    #[must_use]
    pub fn new_pair(word_id: WordId, ease_factor: f64, now: DateTime<Utc>) -> [Self; 2] {
        Direction::ALL.map(|direction| Self::new(ProgressKey::new(word_id, direction), ease_factor, now))
    }

    /// Rehydrate a record from storage, checking numeric invariants.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the interval or ease are out of range or
    /// the bookkeeping timestamps are inverted.
    pub fn from_persisted(record: Self) -> Result<Self, ProgressError> {
        if !record.interval_days.is_finite() || record.interval_days < 0.0 {
            return Err(ProgressError::InvalidInterval(record.interval_days));
        }
        if !record.ease_factor.is_finite() || record.ease_factor < EASE_FLOOR {
            return Err(ProgressError::InvalidEase(record.ease_factor));
        }
        if record.updated_at < record.created_at {
            return Err(ProgressError::InvalidTimeRange);
        }
        Ok(record)
    }

    #[must_use]
    pub fn word_id(&self) -> WordId {
        self.key.word_id
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.key.direction
    }

    /// Never answered in this direction.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.last_review_at.is_none()
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_at
    }

    /// Selected and not mastered.
    #[must_use]
    pub fn is_schedulable(&self) -> bool {
        self.is_selected && !self.is_mastered
    }

    #[must_use]
    pub fn stage(&self) -> StudyStage {
        if self.is_mastered {
            StudyStage::Mastered
        } else if self.is_new() {
            StudyStage::New
        } else if self.learning_phase {
            StudyStage::Learning
        } else {
            StudyStage::Review
        }
    }
}

/// A word joined with its progress in one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordWithProgress {
    pub word: Word,
    pub progress: WordProgress,
}

impl WordWithProgress {
    #[must_use]
    pub fn prompt(&self) -> &str {
        self.word.prompt(self.progress.direction())
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        self.word.answer(self.progress.direction())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
