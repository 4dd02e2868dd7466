use crate::resilience::sweep::SweepSchedule;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Storage of the last accepted execution time per identity.
#[async_trait]
pub trait DebounceStore: Send + Sync {
    async fn last_execution(&self, identity: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>>;
    async fn touch(&self, identity: &str, at: DateTime<Utc>) -> Result<()>;
    /// Drop entries older than the store's retention. Returns the number removed.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

/// Remaining wait before `identity` may execute again, or `None` when the window has passed.
pub fn remaining_wait(
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> Option<Duration> {
    let elapsed = now - last?;
    if elapsed < window {
        Some(window - elapsed)
    } else {
        None
    }
}

/// Process-local timestamp map swept every ten minutes.
pub struct MemoryDebounceStore {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    schedule: SweepSchedule,
    retention: Duration,
}

impl MemoryDebounceStore {
    /// `window` is the debounce window in use; entries are kept for at least an hour and
    /// never shorter than the window.
    pub fn new(window: Duration) -> Self {
        Self::with_sweep(Duration::minutes(10), Duration::hours(1).max(window))
    }

    pub fn with_sweep(interval: Duration, retention: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            schedule: SweepSchedule::new(interval),
            retention,
        }
    }

    fn sweep_locked(&self, entries: &mut HashMap<String, DateTime<Utc>>, now: DateTime<Utc>) -> usize {
        let before = entries.len();
        entries.retain(|_, last| now - *last <= self.retention);
        before - entries.len()
    }
}

#[async_trait]
impl DebounceStore for MemoryDebounceStore {
    async fn last_execution(&self, identity: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        let mut entries = self.entries.lock().await;
        if self.schedule.try_begin(now) {
            let removed = self.sweep_locked(&mut entries, now);
            if removed > 0 {
                tracing::debug!(removed, "swept idle debounce entries");
            }
        }
        Ok(entries.get(identity).copied())
    }

    async fn touch(&self, identity: &str, at: DateTime<Utc>) -> Result<()> {
        self.entries.lock().await.insert(identity.to_string(), at);
        Ok(())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        Ok(self.sweep_locked(&mut entries, now))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.lock().await.len())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
