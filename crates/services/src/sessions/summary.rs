use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vocab_core::model::{Direction, Quality};

use super::service::SessionAnswer;

/// Per-quality tally of one study session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub direction: Direction,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_answers: u32,
    pub hard: u32,
    pub medium: u32,
    pub easy: u32,
    pub distinct_words: u32,
    /// Answers that moved a word out of the learning phase.
    pub graduated: u32,
    pub newly_mastered: u32,
}

impl SessionSummary {
    #[must_use]
    pub fn from_answers(
        direction: Direction,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        answers: &[SessionAnswer],
    ) -> Self {
        let mut summary = Self {
            direction,
            started_at,
            completed_at,
            total_answers: 0,
            hard: 0,
            medium: 0,
            easy: 0,
            distinct_words: 0,
            graduated: 0,
            newly_mastered: 0,
        };

        let mut words = HashSet::new();
        for answer in answers {
            summary.total_answers += 1;
            match answer.quality {
                Quality::Hard => summary.hard += 1,
                Quality::Medium => summary.medium += 1,
                Quality::Easy => summary.easy += 1,
            }
            if answer.was_learning && !answer.progress.learning_phase {
                summary.graduated += 1;
            }
            if answer.progress.is_mastered {
                summary.newly_mastered += 1;
            }
            words.insert(answer.key.word_id);
        }
        summary.distinct_words = u32::try_from(words.len()).unwrap_or(u32::MAX);
        summary
    }

    /// Share of answers that were not `Hard`, in `0.0..=1.0`.
    #[must_use]
    pub fn recall_rate(&self) -> f64 {
        if self.total_answers == 0 {
            return 0.0;
        }
        f64::from(self.medium + self.easy) / f64::from(self.total_answers)
    }
}
