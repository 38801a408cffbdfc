//! Wall-clock source for timestamps and timestamp ids.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start the clock at `start`.
    #[must_use]
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start the clock at a Unix millisecond timestamp.
    #[must_use]
    pub fn at_millis(ms: i64) -> Self {
        Self::new(DateTime::from_timestamp_millis(ms).unwrap_or_default())
    }

    /// Move the clock forward (or backward, for a negative delta).
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Next timestamp id for a collection: the current time in milliseconds,
/// bumped past the largest id already present.
#[must_use]
pub fn next_timestamp_id(now_ms: i64, existing: impl IntoIterator<Item = i64>) -> i64 {
    existing
        .into_iter()
        .max()
        .map_or(now_ms, |max| now_ms.max(max.saturating_add(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at_millis(1_000);
        clock.advance(TimeDelta::milliseconds(250));
        assert_eq!(clock.now_ms(), 1_250);
    }

    #[test]
    fn test_timestamp_id_uses_now_when_free() {
        assert_eq!(next_timestamp_id(500, []), 500);
        assert_eq!(next_timestamp_id(500, [100, 200]), 500);
    }

    #[test]
    fn test_timestamp_id_bumps_on_collision() {
        assert_eq!(next_timestamp_id(500, [500]), 501);
        assert_eq!(next_timestamp_id(500, [100, 900]), 901);
    }
}
