use crate::resilience::sweep::SweepSchedule;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Daily counter of one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    /// UTC calendar date the count belongs to.
    pub window_date: NaiveDate,
}

/// Storage of per-identity daily invocation counters.
///
/// Days are UTC calendar dates derived from the `now` handed in by the caller.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Accepted invocations of `identity` on the day of `now`. A stale day reads as zero.
    async fn count(&self, identity: &str, now: DateTime<Utc>) -> Result<u32>;
    /// Record one accepted invocation and return the new count for the day.
    async fn increment(&self, identity: &str, now: DateTime<Utc>) -> Result<u32>;
    /// Drop entries whose window is not the day of `now`. Returns the number removed.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

/// Process-local counter map with an hourly lazy sweep.
pub struct MemoryRateLimitStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    schedule: SweepSchedule,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::with_sweep_interval(Duration::hours(1))
    }

    pub fn with_sweep_interval(interval: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            schedule: SweepSchedule::new(interval),
        }
    }

    fn sweep_locked(entries: &mut HashMap<String, RateLimitEntry>, today: NaiveDate) -> usize {
        let before = entries.len();
        entries.retain(|_, e| e.window_date == today);
        before - entries.len()
    }

    fn maybe_sweep(&self, entries: &mut HashMap<String, RateLimitEntry>, now: DateTime<Utc>) {
        if self.schedule.try_begin(now) {
            let removed = Self::sweep_locked(entries, now.date_naive());
            if removed > 0 {
                tracing::debug!(removed, "swept stale rate-limit entries");
            }
        }
    }
}

impl Default for MemoryRateLimitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn count(&self, identity: &str, now: DateTime<Utc>) -> Result<u32> {
        let today = now.date_naive();
        let mut entries = self.entries.lock().await;
        self.maybe_sweep(&mut entries, now);
        match entries.get_mut(identity) {
            Some(entry) if entry.window_date == today => Ok(entry.count),
            Some(entry) => {
                // first check of a new day resets the window
                *entry = RateLimitEntry {
                    count: 0,
                    window_date: today,
                };
                Ok(0)
            }
            None => Ok(0),
        }
    }

    async fn increment(&self, identity: &str, now: DateTime<Utc>) -> Result<u32> {
        let today = now.date_naive();
        let mut entries = self.entries.lock().await;
        let entry = entries
            .entry(identity.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_date: today,
            });
        if entry.window_date != today {
            entry.count = 0;
            entry.window_date = today;
        }
        entry.count = entry.count.saturating_add(1);
        Ok(entry.count)
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        Ok(Self::sweep_locked(&mut entries, now.date_naive()))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.lock().await.len())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, d, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_count_starts_at_zero() {
        let store = MemoryRateLimitStore::new();
        assert_eq!(store.count("guest:a", at(19, 9, 0)).await.unwrap(), 0);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_is_monotonic_within_a_day() {
        let store = MemoryRateLimitStore::new();
        for expected in 1..=3 {
            assert_eq!(store.increment("guest:a", at(19, 9, expected)).await.unwrap(), expected);
        }
        assert_eq!(store.count("guest:a", at(19, 23, 59)).await.unwrap(), 3);
        assert_eq!(store.count("guest:b", at(19, 23, 59)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_new_day_resets_lazily() {
        let store = MemoryRateLimitStore::new();
        store.increment("guest:a", at(19, 23, 0)).await.unwrap();
        store.increment("guest:a", at(19, 23, 1)).await.unwrap();

        assert_eq!(store.count("guest:a", at(20, 0, 0)).await.unwrap(), 0);
        assert_eq!(store.increment("guest:a", at(20, 0, 1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_increment_after_stale_day_without_check() {
        let store = MemoryRateLimitStore::new();
        store.increment("guest:a", at(19, 10, 0)).await.unwrap();
        assert_eq!(store.increment("guest:a", at(21, 10, 0)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_stale_days() {
        let store = MemoryRateLimitStore::new();
        store.increment("guest:old", at(18, 10, 0)).await.unwrap();
        store.increment("guest:new", at(19, 10, 0)).await.unwrap();

        assert_eq!(store.sweep(at(19, 11, 0)).await.unwrap(), 1);
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.count("guest:new", at(19, 11, 0)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lazy_sweep_is_throttled() {
        let store = MemoryRateLimitStore::with_sweep_interval(Duration::hours(1));
        // first access claims the sweep slot
        store.count("guest:x", at(19, 23, 30)).await.unwrap();
        store.increment("guest:old", at(19, 23, 40)).await.unwrap();

        // new day but inside the interval: the stale entry survives
        store.count("guest:y", at(20, 0, 10)).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 1);

        // once the interval elapses the next access sweeps it
        store.count("guest:y", at(20, 0, 31)).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
