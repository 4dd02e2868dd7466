//! Cache backend implementations.

use super::key::CacheKey;
use crate::clock::{Clock, SystemClock};
use crate::resilience::sweep::SweepSchedule;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Clone, Debug)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>>;
    /// Store `value` for `ttl`. Replaces any previous entry under the same key.
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    async fn exists(&self, key: &CacheKey) -> Result<bool>;
    /// Physically remove expired entries. Returns the number removed.
    async fn sweep(&self) -> Result<usize>;
    async fn clear(&self) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    fn name(&self) -> &'static str;
}

/// Unbounded in-memory cache.
///
/// Expired entries are invisible to readers immediately and physically removed by a sweep that
/// runs during a regular access at most once per sweep interval (one minute by default).
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    clock: Arc<dyn Clock>,
    schedule: SweepSchedule,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
            schedule: SweepSchedule::new(chrono::Duration::seconds(60)),
        }
    }

    fn sweep_locked(entries: &mut HashMap<String, CacheEntry>, now: DateTime<Utc>) -> usize {
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(ttl.max(Duration::from_secs(1)))
            .unwrap_or_else(|_| chrono::Duration::days(365));
        now + ttl
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if self.schedule.try_begin(now) {
            let removed = Self::sweep_locked(&mut entries, now);
            if removed > 0 {
                tracing::debug!(removed, "swept expired cache entries");
            }
        }
        if let Some(entry) = entries.get(&key.hash) {
            if entry.is_expired(now) {
                entries.remove(&key.hash);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let entry = CacheEntry { value: value.to_string(), expires_at: Self::expiry(now, ttl) };
        self.entries.write().unwrap_or_else(|e| e.into_inner()).insert(key.hash.clone(), entry);
        Ok(())
    }
    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.write().unwrap_or_else(|e| e.into_inner()).remove(&key.hash).is_some())
    }
    async fn exists(&self, key: &CacheKey) -> Result<bool> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .get(&key.hash)
            .map(|e| !e.is_expired(now))
            .unwrap_or(false))
    }
    async fn sweep(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Ok(Self::sweep_locked(&mut entries, now))
    }
    async fn clear(&self) -> Result<()> {
        self.entries.write().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        let now = self.clock.now();
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|e| !e.is_expired(now))
            .count())
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Backend that stores nothing; every lookup is a miss.
pub struct NullCache;
impl NullCache {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for NullCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<String>> {
        Ok(None)
    }
    async fn set(&self, _: &CacheKey, _: &str, _: Duration) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    async fn exists(&self, _: &CacheKey) -> Result<bool> {
        Ok(false)
    }
    async fn sweep(&self) -> Result<usize> {
        Ok(0)
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    async fn len(&self) -> Result<usize> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
