use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{Direction, WordId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WordError {
    #[error("source text cannot be empty")]
    EmptySource,

    #[error("target text cannot be empty")]
    EmptyTarget,
}

//
// ─── WORD TYPES ────────────────────────────────────────────────────────────────
//

/// Unvalidated input for a new vocabulary word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordDraft {
    pub source: String,
    pub target: String,
}

impl WordDraft {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Trim both sides and reject blank text.
    ///
    /// # Errors
    ///
    /// Returns `WordError::EmptySource` / `WordError::EmptyTarget` for blank text.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedWord, WordError> {
        let source = self.source.trim();
        if source.is_empty() {
            return Err(WordError::EmptySource);
        }
        let target = self.target.trim();
        if target.is_empty() {
            return Err(WordError::EmptyTarget);
        }

        Ok(ValidatedWord {
            source: source.to_owned(),
            target: target.to_owned(),
            created_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedWord {
    pub source: String,
    pub target: String,
    pub created_at: DateTime<Utc>,
}

impl ValidatedWord {
    #[must_use]
    pub fn assign_id(self, id: WordId) -> Word {
        Word {
            id,
            source: self.source,
            target: self.target,
            created_at: self.created_at,
        }
    }
}

/// A vocabulary item: a source-language term and its translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub source: String,
    pub target: String,
    pub created_at: DateTime<Utc>,
}

impl Word {
    /// Text shown as the prompt when studying in `direction`.
    #[must_use]
    pub fn prompt(&self, direction: Direction) -> &str {
        match direction {
            Direction::SourceToTarget => &self.source,
            Direction::TargetToSource => &self.target,
        }
    }

    /// Text expected as the answer when studying in `direction`.
    #[must_use]
    pub fn answer(&self, direction: Direction) -> &str {
        match direction {
            Direction::SourceToTarget => &self.target,
            Direction::TargetToSource => &self.source,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
