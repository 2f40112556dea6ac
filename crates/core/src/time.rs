use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// Injected time source for the services layer.
///
/// The engine itself never reads time; callers pass `now` explicitly and get
/// it from one of these.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
    Manual(ManualClock),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns a clock whose time is moved by hand and shared between clones.
    #[must_use]
    pub fn manual(start: DateTime<Utc>) -> (Self, ManualClock) {
        let handle = ManualClock::new(start);
        (Self::Manual(handle.clone()), handle)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
            Clock::Manual(m) => m.now(),
        }
    }

    #[must_use]
    pub fn is_system(&self) -> bool {
        matches!(self, Clock::System)
    }
}

/// Handle to a hand-driven clock; every clone observes the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    /// Current instant, pinned to chrono's range if advanced past it.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        let millis = self.millis.load(Ordering::SeqCst);
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(if millis < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    pub fn advance(&self, delta: Duration) {
        let delta = delta.num_milliseconds();
        // The closure always returns Some, so the update cannot fail.
        let _ = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |millis| {
                Some(millis.saturating_add(delta))
            });
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.millis.store(at.timestamp_millis(), Ordering::SeqCst);
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_does_not_move() {
        let clock = fixed_clock();
        assert_eq!(clock.now(), fixed_now());
        assert_eq!(clock.now(), fixed_now());
        assert!(!clock.is_system());
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let (clock, handle) = Clock::manual(fixed_now());
        let other = clock.clone();

        handle.advance(Duration::minutes(15));
        assert_eq!(clock.now(), fixed_now() + Duration::minutes(15));
        assert_eq!(other.now(), clock.now());

        handle.set(fixed_now());
        assert_eq!(other.now(), fixed_now());
    }

    #[test]
    fn manual_clock_saturates_instead_of_wrapping() {
        let (clock, handle) = Clock::manual(DateTime::<Utc>::MAX_UTC);
        handle.advance(Duration::days(365));
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);

        handle.set(DateTime::<Utc>::MIN_UTC);
        handle.advance(Duration::days(-365));
        assert_eq!(clock.now(), DateTime::<Utc>::MIN_UTC);
    }
}
