//! Injectable wall clock.
//!
//! Every timestamp the core writes (record creation, access bookkeeping,
//! relationship interactions) comes from a [`Clock`], so tests can pin and
//! advance time deterministically.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of "now".
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A manually driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// The instant `window` before `now`.
///
/// A window reaching past the earliest representable instant means "no
/// cutoff" and yields [`DateTime::<Utc>::MIN_UTC`].
#[must_use]
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Shared handle to a clock, as held by every store.
pub type SharedClock = Arc<dyn Clock>;

/// The default shared clock (wall time).
#[must_use]
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_start_saturates_at_the_earliest_instant() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().expect("valid date");
        assert_eq!(window_start(now, Duration::hours(2)), now - Duration::hours(2));
        assert_eq!(window_start(now, Duration::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().expect("valid date");
        let clock = ManualClock::new(start);
        let other = clock.clone();

        clock.advance(Duration::hours(3));
        assert_eq!(other.now(), start + Duration::hours(3));

        other.set(start);
        assert_eq!(clock.now(), start);
    }
}
