use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::EASE_FLOOR;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("daily goal must be > 0")]
    InvalidDailyGoal,

    #[error("graduation repetitions must be > 0")]
    InvalidGraduationReps,

    #[error("mastery repetitions must be >= graduation repetitions")]
    InvalidMasteryReps,

    #[error("short learning step must be > 0 minutes")]
    InvalidShortStep,

    #[error("{field} must be finite and > 0, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("minimum ease must be >= 1.3, got {0}")]
    InvalidMinEase(f64),

    #[error("initial ease ({initial}) must be >= minimum ease ({min})")]
    InvalidEaseBounds { initial: f64, min: f64 },

    #[error("easy bonus must be >= 1, got {0}")]
    InvalidEasyBonus(f64),

    #[error("maximum interval must be between the initial interval and 1000000 days")]
    InvalidIntervalBounds,

    #[error("reinsert offset must be > 0")]
    InvalidReinsertOffset,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Largest accepted `max_interval_days`; keeps due dates inside chrono's range.
pub const MAX_INTERVAL_DAYS_LIMIT: f64 = 1_000_000.0;

/// Tunable constants of the progress update engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Successful learning answers needed to leave the learning phase.
    pub graduation_reps: u32,
    /// Re-show delay inside the learning phase.
    pub short_step_minutes: u32,
    /// Interval granted when the last learning step is answered `Medium`.
    pub medium_step_days: f64,
    /// Interval granted when a learning word is answered `Easy`.
    pub initial_interval_days: f64,
    pub initial_ease: f64,
    pub min_ease: f64,
    pub hard_ease_penalty: f64,
    pub easy_ease_bonus: f64,
    /// Extra interval multiplier for `Easy` reviews.
    pub easy_bonus: f64,
    pub mastery_reps: u32,
    pub mastery_min_interval_days: f64,
    pub max_interval_days: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            graduation_reps: 2,
            short_step_minutes: 10,
            medium_step_days: 1.0,
            initial_interval_days: 4.0,
            initial_ease: 2.5,
            min_ease: EASE_FLOOR,
            hard_ease_penalty: 0.2,
            easy_ease_bonus: 0.15,
            easy_bonus: 1.3,
            mastery_reps: 8,
            mastery_min_interval_days: 30.0,
            max_interval_days: 36_500.0,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn short_step(&self) -> Duration {
        Duration::minutes(i64::from(self.short_step_minutes))
    }

    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.graduation_reps == 0 {
            return Err(ConfigError::InvalidGraduationReps);
        }
        if self.mastery_reps < self.graduation_reps {
            return Err(ConfigError::InvalidMasteryReps);
        }
        if self.short_step_minutes == 0 {
            return Err(ConfigError::InvalidShortStep);
        }
        for (field, value) in [
            ("medium_step_days", self.medium_step_days),
            ("initial_interval_days", self.initial_interval_days),
            ("easy_ease_bonus", self.easy_ease_bonus),
            ("hard_ease_penalty", self.hard_ease_penalty),
            ("mastery_min_interval_days", self.mastery_min_interval_days),
        ] {
            positive(field, value)?;
        }
        if !self.min_ease.is_finite() || self.min_ease < EASE_FLOOR {
            return Err(ConfigError::InvalidMinEase(self.min_ease));
        }
        if !self.initial_ease.is_finite() || self.initial_ease < self.min_ease {
            return Err(ConfigError::InvalidEaseBounds {
                initial: self.initial_ease,
                min: self.min_ease,
            });
        }
        if !self.easy_bonus.is_finite() || self.easy_bonus < 1.0 {
            return Err(ConfigError::InvalidEasyBonus(self.easy_bonus));
        }
        if !self.max_interval_days.is_finite()
            || self.max_interval_days < self.initial_interval_days
            || self.max_interval_days < self.medium_step_days
            || self.max_interval_days > MAX_INTERVAL_DAYS_LIMIT
        {
            return Err(ConfigError::InvalidIntervalBounds);
        }
        Ok(())
    }
}

//
// ─── QUEUE ─────────────────────────────────────────────────────────────────────
//

/// Tunable constants of the session queue builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// How long past due a review word may sit before it counts as overdue.
    pub grace_period_hours: u32,
    /// Learning words due within this window are pulled into the current session.
    pub learn_ahead_minutes: u32,
    /// Spacing between re-shown learning words in the queue.
    pub reinsert_offset: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            grace_period_hours: 24,
            learn_ahead_minutes: 20,
            reinsert_offset: 3,
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::hours(i64::from(self.grace_period_hours))
    }

    #[must_use]
    pub fn learn_ahead(&self) -> Duration {
        Duration::minutes(i64::from(self.learn_ahead_minutes))
    }

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidReinsertOffset` for a zero offset.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reinsert_offset == 0 {
            return Err(ConfigError::InvalidReinsertOffset);
        }
        Ok(())
    }
}

//
// ─── STUDY ─────────────────────────────────────────────────────────────────────
//

/// Everything the engine needs from the caller, with documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Distinct words that may be studied per day in one direction.
    pub daily_goal: u32,
    /// Upper bound on first exposures per session. Zero disables new words.
    pub new_word_cap: u32,
    pub scheduler: SchedulerConfig,
    pub queue: QueueConfig,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            daily_goal: 20,
            new_word_cap: 10,
            scheduler: SchedulerConfig::default(),
            queue: QueueConfig::default(),
        }
    }
}

impl StudyConfig {
    /// # Errors
    ///
    /// Returns the first `ConfigError` found in this config or its sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daily_goal == 0 {
            return Err(ConfigError::InvalidDailyGoal);
        }
        self.scheduler.validate()?;
        self.queue.validate()
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        StudyConfig::default().validate().unwrap();
        assert_eq!(SchedulerConfig::default().short_step(), Duration::minutes(10));
        assert_eq!(QueueConfig::default().grace_period(), Duration::hours(24));
    }

    #[test]
    fn rejects_zero_daily_goal() {
        let cfg = StudyConfig {
            daily_goal: 0,
            ..StudyConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidDailyGoal));
    }

    #[test]
    fn rejects_ease_below_floor() {
        let cfg = SchedulerConfig {
            min_ease: 1.1,
            ..SchedulerConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidMinEase(_))));

        let cfg = SchedulerConfig {
            initial_ease: 1.31,
            min_ease: 1.5,
            ..SchedulerConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidEaseBounds { .. })));
    }

    #[test]
    fn rejects_non_positive_steps() {
        let cfg = SchedulerConfig {
            initial_interval_days: f64::NAN,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NonPositive { field: "initial_interval_days", .. })
        ));
    }

    #[test]
    fn rejects_unrepresentable_interval_cap() {
        let cfg = SchedulerConfig {
            max_interval_days: 1e8,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidIntervalBounds));

        let cfg = SchedulerConfig {
            max_interval_days: MAX_INTERVAL_DAYS_LIMIT,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn rejects_mastery_below_graduation() {
        let cfg = SchedulerConfig {
            graduation_reps: 3,
            mastery_reps: 2,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidMasteryReps));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: StudyConfig =
            serde_json::from_str(r#"{ "daily_goal": 5, "scheduler": { "mastery_reps": 6 } }"#)
                .unwrap();
        assert_eq!(cfg.daily_goal, 5);
        assert_eq!(cfg.new_word_cap, 10);
        assert_eq!(cfg.scheduler.mastery_reps, 6);
        assert_eq!(cfg.scheduler.graduation_reps, 2);
        assert_eq!(cfg.queue, QueueConfig::default());
    }
}
