use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulerConfig;
use crate::model::{Quality, WordProgress};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Convert a fractional day count to a `Duration` at millisecond precision.
///
/// Saturates at `Duration::MAX` for spans chrono cannot represent.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn days_to_duration(days: f64) -> Duration {
    Duration::try_milliseconds((days * MILLIS_PER_DAY).round() as i64).unwrap_or(Duration::MAX)
}

/// `at + span`, pinned to the latest representable instant on overflow.
fn saturating_add(at: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    at.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

//
// ─── SCHEDULED STATES ──────────────────────────────────────────────────────────
//

/// All possible next states of a record, one per answer.
///
/// Useful for labelling answer buttons ("again in 10 min", "in 4 days")
/// before the learner commits to a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledStates {
    pub hard: WordProgress,
    pub medium: WordProgress,
    pub easy: WordProgress,
}

impl ScheduledStates {
    #[must_use]
    pub fn select(&self, quality: Quality) -> &WordProgress {
        match quality {
            Quality::Hard => &self.hard,
            Quality::Medium => &self.medium,
            Quality::Easy => &self.easy,
        }
    }
}

/// When the next review lands relative to the answer.
enum NextReview {
    ShortStep,
    Interval,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// SM-2 derived progress update engine.
///
/// Pure and total: every call maps a valid record to a valid record, never
/// touches storage and never reads the system clock. Intervals are measured
/// from the answer time, so a late review does not compound delay.
///
/// # Examples
///
/// ```
/// # use vocab_core::scheduler::Scheduler;
/// # use vocab_core::model::{Direction, ProgressKey, Quality, WordId, WordProgress, DEFAULT_EASE};
/// let scheduler = Scheduler::default();
/// let now = vocab_core::time::fixed_now();
/// let key = ProgressKey::new(WordId::new(1), Direction::SourceToTarget);
/// let fresh = WordProgress::new(key, DEFAULT_EASE, now);
///
/// let next = scheduler.update(&fresh, Quality::Easy, now);
/// assert!(!next.learning_phase);
/// assert_eq!(next.interval_days, 4.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Apply a learner's answer and return the updated record.
    ///
    /// Mastered records are frozen and come back unchanged.
    #[must_use]
    pub fn update(
        &self,
        progress: &WordProgress,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> WordProgress {
        if progress.is_mastered {
            return progress.clone();
        }

        let mut next = progress.clone();
        let due = if next.learning_phase {
            self.apply_learning(&mut next, quality)
        } else {
            self.apply_review(&mut next, quality)
        };

        next.interval_days = next.interval_days.clamp(0.0, self.config.max_interval_days);
        next.next_review_at = match due {
            NextReview::ShortStep => saturating_add(now, self.config.short_step()),
            NextReview::Interval => saturating_add(now, days_to_duration(next.interval_days)),
        };

        if next.repetitions >= self.config.mastery_reps
            && next.interval_days >= self.config.mastery_min_interval_days
        {
            next.is_mastered = true;
        }

        next.last_review_at = Some(now);
        next.updated_at = now;
        next
    }

    /// Preview the outcome of every possible answer.
    #[must_use]
    pub fn preview(&self, progress: &WordProgress, now: DateTime<Utc>) -> ScheduledStates {
        ScheduledStates {
            hard: self.update(progress, Quality::Hard, now),
            medium: self.update(progress, Quality::Medium, now),
            easy: self.update(progress, Quality::Easy, now),
        }
    }

    /// Explicit reset back to the start of the learning phase.
    ///
    /// This is the only way, besides `set_mastered(false)`, to leave mastery.
    #[must_use]
    pub fn reset(&self, progress: &WordProgress, now: DateTime<Utc>) -> WordProgress {
        WordProgress {
            repetitions: 0,
            interval_days: 0.0,
            ease_factor: self.config.initial_ease,
            learning_phase: true,
            is_mastered: false,
            session_position: 1,
            next_review_at: now,
            updated_at: now,
            ..progress.clone()
        }
    }

    /// Explicit mastery override. Scheduling fields are left as they are.
    #[must_use]
    pub fn set_mastered(
        &self,
        progress: &WordProgress,
        mastered: bool,
        now: DateTime<Utc>,
    ) -> WordProgress {
        WordProgress {
            is_mastered: mastered,
            updated_at: now,
            ..progress.clone()
        }
    }

    fn apply_learning(&self, p: &mut WordProgress, quality: Quality) -> NextReview {
        let cfg = &self.config;
        match quality {
            Quality::Hard => {
                p.repetitions = 0;
                p.session_position = p.session_position.saturating_add(1);
                NextReview::ShortStep
            }
            Quality::Medium => {
                p.repetitions = p.repetitions.saturating_add(1);
                if p.repetitions >= cfg.graduation_reps {
                    p.learning_phase = false;
                    p.interval_days = cfg.medium_step_days;
                    p.session_position = 0;
                    NextReview::Interval
                } else {
                    p.session_position = p.session_position.saturating_add(1);
                    NextReview::ShortStep
                }
            }
            Quality::Easy => {
                p.learning_phase = false;
                p.repetitions = cfg.graduation_reps;
                p.interval_days = cfg.initial_interval_days;
                p.session_position = 0;
                NextReview::Interval
            }
        }
    }

    fn apply_review(&self, p: &mut WordProgress, quality: Quality) -> NextReview {
        let cfg = &self.config;
        // A review-phase record should never carry a zero interval; fall back
        // to the graduation step so growth stays strictly positive.
        let base = if p.interval_days > 0.0 {
            p.interval_days
        } else {
            cfg.medium_step_days
        };

        match quality {
            Quality::Hard => {
                p.repetitions = 0;
                p.ease_factor = (p.ease_factor - cfg.hard_ease_penalty).max(cfg.min_ease);
                p.learning_phase = true;
                p.interval_days = 0.0;
                p.session_position = 1;
                NextReview::ShortStep
            }
            Quality::Medium => {
                p.repetitions = p.repetitions.saturating_add(1);
                p.interval_days = base * p.ease_factor;
                NextReview::Interval
            }
            Quality::Easy => {
                p.repetitions = p.repetitions.saturating_add(1);
                p.ease_factor += cfg.easy_ease_bonus;
                p.interval_days = base * p.ease_factor * cfg.easy_bonus;
                NextReview::Interval
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DEFAULT_EASE, Direction, EASE_FLOOR, ProgressKey, WordId};
    use crate::time::fixed_now;

    fn fresh(direction: Direction) -> WordProgress {
        WordProgress::new(
            ProgressKey::new(WordId::new(1), direction),
            DEFAULT_EASE,
            fixed_now(),
        )
    }

    fn review_phase(repetitions: u32, interval_days: f64, ease_factor: f64) -> WordProgress {
        WordProgress {
            repetitions,
            interval_days,
            ease_factor,
            learning_phase: false,
            last_review_at: Some(fixed_now()),
            ..fresh(Direction::SourceToTarget)
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn learning_hard_resets_and_advances_session_position() {
        let s = Scheduler::default();
        let now = fixed_now();
        let mut p = fresh(Direction::SourceToTarget);
        p.repetitions = 1;

        let next = s.update(&p, Quality::Hard, now);

        assert_eq!(next.repetitions, 0);
        assert!(next.learning_phase);
        assert_eq!(next.session_position, 1);
        assert_eq!(next.next_review_at, now + Duration::minutes(10));
        assert_eq!(next.ease_factor, DEFAULT_EASE);
    }

    #[test]
    fn learning_medium_steps_then_graduates() {
        let s = Scheduler::default();
        let now = fixed_now();
        let first = s.update(&fresh(Direction::SourceToTarget), Quality::Medium, now);

        assert_eq!(first.repetitions, 1);
        assert!(first.learning_phase);
        assert_eq!(first.next_review_at, now + Duration::minutes(10));

        let later = now + Duration::minutes(10);
        let second = s.update(&first, Quality::Medium, later);

        assert_eq!(second.repetitions, 2);
        assert!(!second.learning_phase);
        assert_eq!(second.interval_days, 1.0);
        assert_eq!(second.session_position, 0);
        assert_eq!(second.next_review_at, later + Duration::days(1));
    }

    #[test]
    fn three_easy_answers_scenario() {
        let s = Scheduler::default();
        let now = fixed_now();

        let a1 = s.update(&fresh(Direction::SourceToTarget), Quality::Easy, now);
        assert!(!a1.learning_phase);
        assert_eq!(a1.repetitions, 2);
        assert_eq!(a1.interval_days, 4.0);
        assert_eq!(a1.next_review_at, now + Duration::days(4));

        let t2 = a1.next_review_at;
        let a2 = s.update(&a1, Quality::Easy, t2);
        assert!(approx(a2.ease_factor, 2.65));
        assert!(approx(a2.interval_days, 4.0 * 2.65 * 1.3));
        assert_eq!(a2.repetitions, 3);

        let a3 = s.update(&a2, Quality::Easy, a2.next_review_at);
        assert!(approx(a3.ease_factor, 2.80));
        assert!(approx(a3.interval_days, a2.interval_days * 2.80 * 1.3));
    }

    #[test]
    fn review_hard_is_a_lapse() {
        let s = Scheduler::default();
        let now = fixed_now();
        let next = s.update(&review_phase(5, 20.0, 2.5), Quality::Hard, now);

        assert_eq!(next.repetitions, 0);
        assert_eq!(next.interval_days, 0.0);
        assert!(approx(next.ease_factor, 2.3));
        assert!(next.learning_phase);
        assert_eq!(next.session_position, 1);
        assert_eq!(next.next_review_at, now + Duration::minutes(10));
    }

    #[test]
    fn review_medium_multiplies_by_ease() {
        let s = Scheduler::default();
        let next = s.update(&review_phase(3, 10.0, 2.0), Quality::Medium, fixed_now());
        assert_eq!(next.repetitions, 4);
        assert_eq!(next.ease_factor, 2.0);
        assert!(approx(next.interval_days, 20.0));
    }

    #[test]
    fn repeated_easy_grows_interval_strictly() {
        let s = Scheduler::default();
        let mut now = fixed_now();
        let mut p = s.update(&fresh(Direction::SourceToTarget), Quality::Easy, now);
        let mut last = p.interval_days;
        for _ in 0..4 {
            now = p.next_review_at;
            p = s.update(&p, Quality::Easy, now);
            assert!(p.interval_days > last);
            last = p.interval_days;
        }
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let s = Scheduler::default();
        let mut now = fixed_now();
        let mut p = fresh(Direction::SourceToTarget);
        for _ in 0..30 {
            p = s.update(&p, Quality::Easy, now);
            now = p.next_review_at;
            p = s.update(&p, Quality::Hard, now);
            assert!(p.ease_factor >= EASE_FLOOR);
            p = s.update(&p, Quality::Hard, now);
            assert!(p.ease_factor >= EASE_FLOOR);
        }
        assert_eq!(p.ease_factor, EASE_FLOOR);
    }

    #[test]
    fn any_review_hard_reenters_learning_with_zero_interval() {
        let s = Scheduler::default();
        for (reps, interval, ease) in [(2, 4.0, 2.5), (7, 90.0, 1.3), (3, 0.5, 3.1)] {
            let next = s.update(&review_phase(reps, interval, ease), Quality::Hard, fixed_now());
            assert!(next.learning_phase);
            assert_eq!(next.interval_days, 0.0);
        }
    }

    #[test]
    fn next_review_counts_from_answer_time_not_last_review() {
        let s = Scheduler::default();
        let mut p = review_phase(3, 10.0, 2.0);
        p.last_review_at = Some(fixed_now() - Duration::days(40));
        let late = fixed_now() + Duration::days(7);

        let next = s.update(&p, Quality::Medium, late);
        assert_eq!(next.next_review_at, late + Duration::days(20));
        assert_eq!(next.last_review_at, Some(late));
        assert_eq!(next.updated_at, late);
    }

    #[test]
    fn mastery_is_reached_and_frozen() {
        let s = Scheduler::default();
        let now = fixed_now();
        let next = s.update(&review_phase(7, 20.0, 2.5), Quality::Medium, now);
        assert_eq!(next.repetitions, 8);
        assert!(next.interval_days >= 30.0);
        assert!(next.is_mastered);

        let frozen = s.update(&next, Quality::Hard, now + Duration::days(1));
        assert_eq!(frozen, next);
    }

    #[test]
    fn mastery_needs_both_repetitions_and_interval() {
        let s = Scheduler::default();
        let short = s.update(&review_phase(7, 2.0, 2.5), Quality::Medium, fixed_now());
        assert_eq!(short.repetitions, 8);
        assert!(!short.is_mastered);

        let few = s.update(&review_phase(3, 40.0, 2.5), Quality::Medium, fixed_now());
        assert!(few.interval_days >= 30.0);
        assert!(!few.is_mastered);
    }

    #[test]
    fn interval_is_capped() {
        let s = Scheduler::new(SchedulerConfig {
            max_interval_days: 50.0,
            mastery_reps: 100,
            ..SchedulerConfig::default()
        });
        let next = s.update(&review_phase(3, 40.0, 2.5), Quality::Easy, fixed_now());
        assert_eq!(next.interval_days, 50.0);
    }

    #[test]
    fn huge_interval_cap_never_overflows_due_date() {
        let s = Scheduler::new(SchedulerConfig {
            max_interval_days: 1e8,
            mastery_reps: 1000,
            ..SchedulerConfig::default()
        });
        let mut progress = fresh(Direction::SourceToTarget);
        for _ in 0..20 {
            progress = s.update(&progress, Quality::Easy, fixed_now());
            assert!(progress.next_review_at >= fixed_now());
        }
        assert_eq!(progress.interval_days, 1e8);
        assert_eq!(progress.next_review_at, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn largest_accepted_cap_stays_representable() {
        let s = Scheduler::new(SchedulerConfig {
            max_interval_days: crate::config::MAX_INTERVAL_DAYS_LIMIT,
            mastery_reps: 1000,
            ..SchedulerConfig::default()
        });
        s.config().validate().unwrap();
        let next = s.update(&review_phase(3, 900_000.0, 2.5), Quality::Easy, fixed_now());
        assert_eq!(next.interval_days, crate::config::MAX_INTERVAL_DAYS_LIMIT);
        assert_eq!(next.next_review_at, fixed_now() + Duration::days(1_000_000));
    }

    #[test]
    fn reset_returns_to_learning() {
        let s = Scheduler::default();
        let later = fixed_now() + Duration::days(3);
        let mut mastered = review_phase(9, 45.0, 1.9);
        mastered.is_mastered = true;

        let reset = s.reset(&mastered, later);
        assert_eq!(reset.repetitions, 0);
        assert_eq!(reset.interval_days, 0.0);
        assert_eq!(reset.ease_factor, 2.5);
        assert!(reset.learning_phase);
        assert!(!reset.is_mastered);
        assert_eq!(reset.session_position, 1);
        assert_eq!(reset.next_review_at, later);
        assert_eq!(reset.key, mastered.key);
        assert_eq!(reset.created_at, mastered.created_at);
    }

    #[test]
    fn set_mastered_only_touches_flag() {
        let s = Scheduler::default();
        let p = review_phase(2, 4.0, 2.5);
        let later = fixed_now() + Duration::hours(1);
        let marked = s.set_mastered(&p, true, later);
        assert!(marked.is_mastered);
        assert_eq!(marked.interval_days, p.interval_days);
        assert_eq!(marked.updated_at, later);

        let unmarked = s.set_mastered(&marked, false, later);
        assert!(!unmarked.is_mastered);
    }

    #[test]
    fn update_is_pure_per_direction() {
        let s = Scheduler::default();
        let forward = fresh(Direction::SourceToTarget);
        let backward = fresh(Direction::TargetToSource);
        let before = backward.clone();

        let _ = s.update(&forward, Quality::Easy, fixed_now());
        assert_eq!(backward, before);
    }

    #[test]
    fn preview_matches_update() {
        let s = Scheduler::default();
        let p = review_phase(3, 10.0, 2.5);
        let states = s.preview(&p, fixed_now());
        for q in [Quality::Hard, Quality::Medium, Quality::Easy] {
            assert_eq!(states.select(q), &s.update(&p, q, fixed_now()));
        }
        assert!(states.hard.next_review_at < states.medium.next_review_at);
        assert!(states.medium.next_review_at < states.easy.next_review_at);
    }

    #[test]
    fn days_to_duration_keeps_fractions() {
        assert_eq!(days_to_duration(1.5), Duration::hours(36));
        assert_eq!(days_to_duration(0.0), Duration::zero());
    }
}
