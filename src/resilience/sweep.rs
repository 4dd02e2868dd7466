use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Throttle for lazy, access-triggered sweeps.
///
/// Stores call [`SweepSchedule::try_begin`] on every access; it returns `true` at most once per
/// interval, and the caller then removes stale entries inline.
#[derive(Debug)]
pub struct SweepSchedule {
    interval: Duration,
    last: Mutex<Option<DateTime<Utc>>>,
}

impl SweepSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Claim the sweep slot if the interval has elapsed since the last sweep.
    pub fn try_begin(&self, now: DateTime<Utc>) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(prev) if now - prev < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_first_access_sweeps_then_throttles() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let schedule = SweepSchedule::new(Duration::seconds(60));

        assert!(schedule.try_begin(t0));
        assert!(!schedule.try_begin(t0 + Duration::seconds(59)));
        assert!(schedule.try_begin(t0 + Duration::seconds(60)));
        assert!(!schedule.try_begin(t0 + Duration::seconds(61)));
    }
}
