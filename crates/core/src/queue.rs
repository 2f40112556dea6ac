use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::QueueConfig;
use crate::model::{ProgressKey, WordId, WordProgress};

//
// ─── BUCKETS & COUNTS ──────────────────────────────────────────────────────────
//

/// Why a record is in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueBucket {
    /// Review word past due by more than the grace period.
    Overdue,
    /// Review word due within the grace period.
    Due,
    /// Never answered in this direction.
    New,
    /// Answered before but still in the learning phase.
    Learning,
}

/// Per-direction backlog counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub new: usize,
    pub learning: usize,
    pub review: usize,
    pub overdue: usize,
    pub mastered: usize,
}

impl QueueCounts {
    /// Everything that could be studied right now, ignoring daily limits.
    #[must_use]
    pub fn total_active(&self) -> usize {
        self.new + self.learning + self.review + self.overdue
    }
}

/// One slot in a study queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub key: ProgressKey,
    pub bucket: QueueBucket,
    pub next_review_at: DateTime<Utc>,
}

impl QueueEntry {
    fn from_progress(progress: &WordProgress, bucket: QueueBucket) -> Self {
        Self {
            key: progress.key,
            bucket,
            next_review_at: progress.next_review_at,
        }
    }
}

//
// ─── STUDY QUEUE ───────────────────────────────────────────────────────────────
//

/// Ordered study queue for one direction at one instant.
///
/// Snapshots go stale as soon as time passes or a record changes; rebuild
/// instead of caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyQueue {
    entries: Vec<QueueEntry>,
    counts: QueueCounts,
    studied_today: usize,
    remaining_goal: usize,
}

impl StudyQueue {
    #[must_use]
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<QueueEntry> {
        self.entries
    }

    #[must_use]
    pub fn keys(&self) -> Vec<ProgressKey> {
        self.entries.iter().map(|e| e.key).collect()
    }

    #[must_use]
    pub fn first(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn has_words_to_study(&self) -> bool {
        !self.entries.is_empty()
    }

    /// False once the daily goal is met, however much is still due.
    #[must_use]
    pub fn has_more_words(&self) -> bool {
        self.remaining_goal > 0 && !self.entries.is_empty()
    }

    #[must_use]
    pub fn is_goal_reached(&self) -> bool {
        self.remaining_goal == 0
    }

    /// Distinct words answered today in this snapshot.
    #[must_use]
    pub fn studied_today(&self) -> usize {
        self.studied_today
    }

    #[must_use]
    pub fn remaining_goal(&self) -> usize {
        self.remaining_goal
    }

    #[must_use]
    pub fn counts(&self) -> QueueCounts {
        self.counts
    }

    /// Keep only the first `limit` entries.
    pub fn truncate(&mut self, limit: usize) {
        self.entries.truncate(limit);
    }
}

//
// ─── BUILDER ───────────────────────────────────────────────────────────────────
//

/// Turns a snapshot of progress records into an ordered study queue.
///
/// Order: overdue (oldest first), due (earliest first), new (creation order,
/// capped), with learning-phase re-shows spliced in every `reinsert_offset`
/// slots. Ties break on `word_id`. No randomness.
#[derive(Debug, Clone, Default)]
pub struct QueueBuilder {
    config: QueueConfig,
}

impl QueueBuilder {
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Which bucket `progress` falls into at `now`, if any.
    #[must_use]
    pub fn classify(&self, progress: &WordProgress, now: DateTime<Utc>) -> Option<QueueBucket> {
        if !progress.is_schedulable() {
            return None;
        }
        if progress.is_new() {
            return Some(QueueBucket::New);
        }
        if progress.learning_phase {
            return (progress.next_review_at <= now + self.config.learn_ahead())
                .then_some(QueueBucket::Learning);
        }
        if now.signed_duration_since(progress.next_review_at) > self.config.grace_period() {
            Some(QueueBucket::Overdue)
        } else if progress.is_due(now) {
            Some(QueueBucket::Due)
        } else {
            None
        }
    }

    #[must_use]
    pub fn counts(&self, records: &[WordProgress], now: DateTime<Utc>) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for progress in records.iter().filter(|p| p.is_selected) {
            if progress.is_mastered {
                counts.mastered += 1;
                continue;
            }
            match self.classify(progress, now) {
                Some(QueueBucket::New) => counts.new += 1,
                Some(QueueBucket::Learning) => counts.learning += 1,
                Some(QueueBucket::Due) => counts.review += 1,
                Some(QueueBucket::Overdue) => counts.overdue += 1,
                None => {}
            }
        }
        counts
    }

    /// Build the queue with new words in creation order.
    #[must_use]
    pub fn build(
        &self,
        records: &[WordProgress],
        now: DateTime<Utc>,
        daily_goal: u32,
        new_word_cap: u32,
    ) -> StudyQueue {
        self.build_with(records, now, daily_goal, new_word_cap, |_| {})
    }

    /// Build the queue, letting the caller reorder new-word candidates
    /// (already sorted by creation) before the new-word cap is applied.
    pub fn build_with<'a>(
        &self,
        records: &'a [WordProgress],
        now: DateTime<Utc>,
        daily_goal: u32,
        new_word_cap: u32,
        order_new: impl FnOnce(&mut [&'a WordProgress]),
    ) -> StudyQueue {
        let studied = studied_today(records, now);
        let goal = usize::try_from(daily_goal).unwrap_or(usize::MAX);
        let remaining_goal = goal.saturating_sub(studied.len());
        let counts = self.counts(records, now);

        if remaining_goal == 0 {
            return StudyQueue {
                entries: Vec::new(),
                counts,
                studied_today: studied.len(),
                remaining_goal,
            };
        }

        let mut overdue = Vec::new();
        let mut due = Vec::new();
        let mut new = Vec::new();
        let mut learning = Vec::new();
        for progress in records {
            match self.classify(progress, now) {
                Some(QueueBucket::Overdue) => overdue.push(progress),
                Some(QueueBucket::Due) => due.push(progress),
                Some(QueueBucket::New) => new.push(progress),
                Some(QueueBucket::Learning) => learning.push(progress),
                None => {}
            }
        }

        overdue.sort_by_key(|p| (p.next_review_at, p.word_id()));
        due.sort_by_key(|p| (p.next_review_at, p.word_id()));
        new.sort_by_key(|p| (p.created_at, p.word_id()));
        learning.sort_by_key(|p| (p.session_position, p.next_review_at, p.word_id()));
        order_new(new.as_mut_slice());

        let mut admission = Admission {
            studied: &studied,
            taken: 0,
            limit: remaining_goal,
        };

        let mut entries = Vec::new();
        for (bucket, list) in [(QueueBucket::Overdue, &overdue), (QueueBucket::Due, &due)] {
            for progress in list {
                if admission.admit(progress) {
                    entries.push(QueueEntry::from_progress(progress, bucket));
                }
            }
        }

        let new_cap = usize::try_from(new_word_cap).unwrap_or(usize::MAX);
        let mut new_taken = 0;
        for progress in &new {
            if new_taken >= new_cap {
                break;
            }
            if admission.admit(progress) {
                entries.push(QueueEntry::from_progress(progress, QueueBucket::New));
                new_taken += 1;
            }
        }

        let offset = usize::try_from(self.config.reinsert_offset.max(1)).unwrap_or(usize::MAX);
        let mut inserted = 0;
        for progress in &learning {
            if !admission.admit(progress) {
                continue;
            }
            let at = offset.saturating_mul(inserted + 1).min(entries.len());
            entries.insert(at, QueueEntry::from_progress(progress, QueueBucket::Learning));
            inserted += 1;
        }

        StudyQueue {
            entries,
            counts,
            studied_today: studied.len(),
            remaining_goal,
        }
    }
}

/// Daily-goal gate: words already studied today pass freely, fresh words
/// pass until the remaining goal is used up.
struct Admission<'s> {
    studied: &'s HashSet<WordId>,
    taken: usize,
    limit: usize,
}

impl Admission<'_> {
    fn admit(&mut self, progress: &WordProgress) -> bool {
        if self.studied.contains(&progress.word_id()) {
            return true;
        }
        if self.taken >= self.limit {
            return false;
        }
        self.taken += 1;
        true
    }
}

/// Distinct selected words answered on `now`'s UTC day.
#[must_use]
pub fn studied_today(records: &[WordProgress], now: DateTime<Utc>) -> HashSet<WordId> {
    let today = now.date_naive();
    records
        .iter()
        .filter(|p| p.is_selected)
        .filter(|p| {
            p.last_review_at
                .is_some_and(|at| at <= now && at.date_naive() == today)
        })
        .map(WordProgress::word_id)
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DEFAULT_EASE, Direction, Quality};
    use crate::scheduler::Scheduler;
    use crate::time::fixed_now;
    use chrono::Duration;

    const DIR: Direction = Direction::SourceToTarget;

    fn new_word(id: u64, created_offset_secs: i64) -> WordProgress {
        WordProgress::new(
            ProgressKey::new(WordId::new(id), DIR),
            DEFAULT_EASE,
            fixed_now() - Duration::days(60) + Duration::seconds(created_offset_secs),
        )
    }

    /// Review-phase word last answered well before today.
    fn review_word(id: u64, next_review_at: DateTime<Utc>) -> WordProgress {
        WordProgress {
            repetitions: 3,
            interval_days: 10.0,
            learning_phase: false,
            last_review_at: Some(fixed_now() - Duration::days(30)),
            next_review_at,
            ..new_word(id, 0)
        }
    }

    fn learning_word(id: u64, session_position: u32, reviewed_at: DateTime<Utc>) -> WordProgress {
        WordProgress {
            repetitions: 0,
            learning_phase: true,
            session_position,
            last_review_at: Some(reviewed_at),
            next_review_at: reviewed_at + Duration::minutes(10),
            ..new_word(id, 0)
        }
    }

    fn ids(queue: &StudyQueue) -> Vec<u64> {
        queue.entries().iter().map(|e| e.key.word_id.value()).collect()
    }

    #[test]
    fn empty_input_yields_empty_queue() {
        let q = QueueBuilder::default().build(&[], fixed_now(), 10, 5);
        assert!(q.is_empty());
        assert!(!q.has_words_to_study());
        assert!(!q.has_more_words());
        assert_eq!(q.counts(), QueueCounts::default());
    }

    #[test]
    fn orders_overdue_then_due_then_new() {
        let now = fixed_now();
        let records = vec![
            new_word(1, 10),
            review_word(2, now - Duration::hours(2)),
            review_word(3, now - Duration::days(5)),
            new_word(4, 5),
            review_word(5, now - Duration::days(2)),
            review_word(6, now - Duration::hours(1)),
            review_word(7, now + Duration::days(1)),
        ];

        let q = QueueBuilder::default().build(&records, now, 50, 10);

        assert_eq!(ids(&q), vec![3, 5, 2, 6, 4, 1]);
        let buckets: Vec<_> = q.entries().iter().map(|e| e.bucket).collect();
        assert_eq!(
            buckets,
            vec![
                QueueBucket::Overdue,
                QueueBucket::Overdue,
                QueueBucket::Due,
                QueueBucket::Due,
                QueueBucket::New,
                QueueBucket::New,
            ]
        );
    }

    #[test]
    fn equal_due_times_break_on_word_id() {
        let now = fixed_now();
        let due_at = now - Duration::hours(3);
        let records = vec![review_word(9, due_at), review_word(2, due_at), review_word(5, due_at)];
        let q = QueueBuilder::default().build(&records, now, 50, 10);
        assert_eq!(ids(&q), vec![2, 5, 9]);
    }

    #[test]
    fn new_words_are_capped() {
        let records: Vec<_> = (1..=8).map(|id| new_word(id, i64::try_from(id).unwrap())).collect();
        let q = QueueBuilder::default().build(&records, fixed_now(), 50, 3);
        assert_eq!(ids(&q), vec![1, 2, 3]);
        assert_eq!(q.counts().new, 8);
    }

    #[test]
    fn mastered_and_unselected_are_excluded() {
        let now = fixed_now();
        let mut mastered = review_word(1, now - Duration::days(3));
        mastered.is_mastered = true;
        let mut unselected = new_word(2, 0);
        unselected.is_selected = false;
        let records = vec![mastered, unselected, new_word(3, 0)];

        let q = QueueBuilder::default().build(&records, now, 50, 10);
        assert_eq!(ids(&q), vec![3]);
        assert_eq!(q.counts().mastered, 1);
        assert_eq!(q.counts().new, 1);
    }

    #[test]
    fn learning_words_are_reinserted_at_offset() {
        let now = fixed_now();
        let mut records: Vec<_> = (1..=6)
            .map(|id| review_word(id, now - Duration::hours(i64::try_from(id).unwrap())))
            .collect();
        records.push(learning_word(20, 2, now - Duration::minutes(5)));
        records.push(learning_word(21, 1, now - Duration::minutes(1)));

        let q = QueueBuilder::default().build(&records, now, 50, 10);

        // Due words: oldest first -> 6,5,4,3,2,1; learning by session_position.
        assert_eq!(ids(&q), vec![6, 5, 4, 21, 3, 2, 20, 1]);
        assert_eq!(q.entries()[3].bucket, QueueBucket::Learning);
    }

    #[test]
    fn learning_words_outside_learn_ahead_wait() {
        let now = fixed_now();
        let mut far = learning_word(1, 1, now);
        far.next_review_at = now + Duration::hours(2);
        let q = QueueBuilder::default().build(&[far], now, 50, 10);
        assert!(q.is_empty());
    }

    #[test]
    fn daily_goal_reached_mid_queue_stops_session() {
        let now = fixed_now();
        let mut records = Vec::new();
        for id in 1..=10 {
            let mut studied = review_word(id, now + Duration::days(4));
            studied.last_review_at = Some(now - Duration::minutes(i64::try_from(id).unwrap()));
            records.push(studied);
        }
        for id in 11..=50 {
            records.push(review_word(id, now - Duration::hours(1)));
        }

        let q = QueueBuilder::default().build(&records, now, 10, 5);

        assert_eq!(q.studied_today(), 10);
        assert!(q.is_goal_reached());
        assert!(!q.has_more_words());
        assert!(q.is_empty());
        assert_eq!(q.counts().review, 40);
    }

    #[test]
    fn remaining_goal_limits_fresh_words_but_not_reshows() {
        let now = fixed_now();
        let mut records = vec![learning_word(1, 1, now - Duration::minutes(15))];
        for id in 2..=6 {
            records.push(review_word(id, now - Duration::hours(1)));
        }

        // One word studied today, goal of 3 leaves room for two fresh words.
        let q = QueueBuilder::default().build(&records, now, 3, 5);
        assert_eq!(q.remaining_goal(), 2);
        assert_eq!(ids(&q), vec![2, 3, 1]);
        assert!(q.has_more_words());
    }

    #[test]
    fn build_is_deterministic() {
        let now = fixed_now();
        let records = vec![
            new_word(3, 0),
            new_word(1, 0),
            review_word(2, now - Duration::days(3)),
            learning_word(4, 1, now - Duration::minutes(12)),
        ];
        let builder = QueueBuilder::default();
        let first = builder.build(&records, now, 20, 10);
        for _ in 0..5 {
            assert_eq!(builder.build(&records, now, 20, 10), first);
        }
    }

    #[test]
    fn build_with_can_reorder_new_words_before_cap() {
        let records: Vec<_> = (1..=4).map(|id| new_word(id, i64::try_from(id).unwrap())).collect();
        let q = QueueBuilder::default().build_with(&records, fixed_now(), 20, 2, |new| new.reverse());
        assert_eq!(ids(&q), vec![4, 3]);
    }

    #[test]
    fn answered_word_leaves_and_learning_word_returns() {
        let scheduler = Scheduler::default();
        let builder = QueueBuilder::default();
        let now = fixed_now();
        let mut records = vec![new_word(1, 0), new_word(2, 1), new_word(3, 2)];

        records[0] = scheduler.update(&records[0], Quality::Hard, now);
        let q = builder.build(&records, now, 20, 10);

        assert_eq!(ids(&q), vec![2, 3, 1]);
        assert_eq!(q.studied_today(), 1);

        records[1] = scheduler.update(&records[1], Quality::Easy, now);
        let q = builder.build(&records, now, 20, 10);
        assert_eq!(ids(&q), vec![3, 1]);
    }

    #[test]
    fn studied_today_ignores_yesterday_and_other_flags() {
        let now = fixed_now();
        let mut yesterday = review_word(1, now);
        yesterday.last_review_at = Some(now - Duration::days(1));
        let mut today = review_word(2, now);
        today.last_review_at = Some(now);
        let mut unselected = review_word(3, now);
        unselected.last_review_at = Some(now);
        unselected.is_selected = false;

        let studied = studied_today(&[yesterday, today, unselected], now);
        assert_eq!(studied.len(), 1);
        assert!(studied.contains(&WordId::new(2)));
    }

    #[test]
    fn counts_partition_backlog() {
        let now = fixed_now();
        let mut mastered = review_word(5, now);
        mastered.is_mastered = true;
        let records = vec![
            new_word(1, 0),
            review_word(2, now - Duration::hours(2)),
            review_word(3, now - Duration::days(3)),
            learning_word(4, 1, now - Duration::minutes(11)),
            mastered,
            review_word(6, now + Duration::days(2)),
        ];

        let counts = QueueBuilder::default().counts(&records, now);
        assert_eq!(
            counts,
            QueueCounts {
                new: 1,
                learning: 1,
                review: 1,
                overdue: 1,
                mastered: 1,
            }
        );
        assert_eq!(counts.total_active(), 4);
    }
}
