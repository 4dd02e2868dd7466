//! Cache manager.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use super::backend::CacheBackend;
use super::key::CacheKey;
use crate::Result;

#[derive(Debug, Clone)]
pub struct CacheConfig { pub default_ttl: Duration, pub enabled: bool, pub max_entry_size: usize, pub key_prefix: Option<String> }

impl Default for CacheConfig {
    fn default() -> Self { Self { default_ttl: Duration::from_secs(86_400), enabled: true, max_entry_size: 1024 * 1024, key_prefix: None } }
}

impl CacheConfig {
    pub fn new() -> Self { Self::default() }
    pub fn with_ttl(mut self, ttl: Duration) -> Self { self.default_ttl = ttl; self }
    pub fn with_enabled(mut self, enabled: bool) -> Self { self.enabled = enabled; self }
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self { self.key_prefix = Some(prefix.into()); self }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats { pub hits: u64, pub misses: u64, pub sets: u64, pub evictions: u64, pub errors: u64, pub oversized: u64 }

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 { let total = self.hits + self.misses; if total == 0 { 0.0 } else { self.hits as f64 / total as f64 } }
}

struct AtomicStats { hits: AtomicU64, misses: AtomicU64, sets: AtomicU64, evictions: AtomicU64, errors: AtomicU64, oversized: AtomicU64 }
impl AtomicStats {
    fn new() -> Self { Self { hits: AtomicU64::new(0), misses: AtomicU64::new(0), sets: AtomicU64::new(0), evictions: AtomicU64::new(0), errors: AtomicU64::new(0), oversized: AtomicU64::new(0) } }
    fn to_stats(&self) -> CacheStats { CacheStats { hits: self.hits.load(Ordering::Relaxed), misses: self.misses.load(Ordering::Relaxed), sets: self.sets.load(Ordering::Relaxed), evictions: self.evictions.load(Ordering::Relaxed), errors: self.errors.load(Ordering::Relaxed), oversized: self.oversized.load(Ordering::Relaxed) } }
}

/// Front of a [`CacheBackend`] holding the TTL policy and hit/miss statistics.
///
/// Values are the serialized payloads exactly as they are returned to callers; decoding and
/// validating them is the guard's job, which reports corrupt entries back through
/// [`CacheManager::evict`] and [`CacheManager::record_corrupt`].
pub struct CacheManager { config: CacheConfig, backend: Box<dyn CacheBackend>, stats: Arc<AtomicStats> }

impl CacheManager {
    pub fn new(config: CacheConfig, backend: Box<dyn CacheBackend>) -> Self { Self { config, backend, stats: Arc::new(AtomicStats::new()) } }

    pub async fn get(&self, key: &CacheKey) -> Result<Option<String>> {
        if !self.config.enabled { return Ok(None); }
        let prefixed = self.prefix_key(key);
        match self.backend.get(&prefixed).await {
            Ok(Some(value)) => { self.stats.hits.fetch_add(1, Ordering::Relaxed); Ok(Some(value)) }
            Ok(None) => { self.stats.misses.fetch_add(1, Ordering::Relaxed); Ok(None) }
            Err(e) => { self.stats.errors.fetch_add(1, Ordering::Relaxed); Err(e) }
        }
    }

    pub async fn set(&self, key: &CacheKey, value: &str) -> Result<()> { self.set_with_ttl(key, value, self.config.default_ttl).await }

    pub async fn set_with_ttl(&self, key: &CacheKey, value: &str, ttl: Duration) -> Result<()> {
        if !self.config.enabled { return Ok(()); }
        if value.len() > self.config.max_entry_size {
            // not cached: repeats of this request reach the provider and consume a slot
            self.stats.oversized.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(cache_key = key.short(), size = value.len(), limit = self.config.max_entry_size, "payload too large to cache");
            return Ok(());
        }
        let prefixed = self.prefix_key(key);
        match self.backend.set(&prefixed, value, ttl).await { Ok(()) => { self.stats.sets.fetch_add(1, Ordering::Relaxed); Ok(()) } Err(e) => { self.stats.errors.fetch_add(1, Ordering::Relaxed); Err(e) } }
    }

    /// Remove an entry that failed validation.
    pub async fn evict(&self, key: &CacheKey) -> Result<bool> {
        if !self.config.enabled { return Ok(false); }
        let prefixed = self.prefix_key(key);
        match self.backend.delete(&prefixed).await { Ok(d) => { if d { self.stats.evictions.fetch_add(1, Ordering::Relaxed); } Ok(d) } Err(e) => { self.stats.errors.fetch_add(1, Ordering::Relaxed); Err(e) } }
    }

    /// Count a hit that turned out to be unusable.
    pub fn record_corrupt(&self) { self.stats.errors.fetch_add(1, Ordering::Relaxed); }

    pub fn stats(&self) -> CacheStats { self.stats.to_stats() }
    pub fn default_ttl(&self) -> Duration { self.config.default_ttl }
    pub fn backend_name(&self) -> &'static str { self.backend.name() }

    fn prefix_key(&self, key: &CacheKey) -> CacheKey {
        if let Some(ref p) = self.config.key_prefix { CacheKey::new(format!("{}:{}", p, key.hash)) } else { key.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NullCache};

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let manager = CacheManager::new(CacheConfig::new(), Box::new(MemoryCache::new()));
        let key = CacheKey::new("abc");

        assert_eq!(manager.get(&key).await.unwrap(), None);
        manager.set(&key, "\"payload\"").await.unwrap();
        assert_eq!(manager.get(&key).await.unwrap().as_deref(), Some("\"payload\""));

        let stats = manager.stats();
        assert_eq!((stats.hits, stats.misses, stats.sets), (1, 1, 1));
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_disabled_cache_is_transparent() {
        let manager = CacheManager::new(CacheConfig::new().with_enabled(false), Box::new(MemoryCache::new()));
        let key = CacheKey::new("abc");
        manager.set(&key, "v").await.unwrap();
        assert_eq!(manager.get(&key).await.unwrap(), None);
        assert_eq!(manager.stats(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_prefix_and_evict() {
        let manager = CacheManager::new(CacheConfig::new().with_key_prefix("minutes"), Box::new(MemoryCache::new()));
        let key = CacheKey::new("abc");
        manager.set(&key, "v").await.unwrap();
        assert!(manager.evict(&key).await.unwrap());
        assert!(!manager.evict(&key).await.unwrap());
        assert_eq!(manager.stats().evictions, 1);
        assert_eq!(manager.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_payload_is_skipped() {
        let config = CacheConfig { max_entry_size: 4, ..CacheConfig::default() };
        let manager = CacheManager::new(config, Box::new(MemoryCache::new()));
        let key = CacheKey::new("abc");
        manager.set(&key, "too long").await.unwrap();
        assert_eq!(manager.get(&key).await.unwrap(), None);
        assert_eq!(manager.stats().sets, 0);
        assert_eq!(manager.stats().oversized, 1);
    }

    #[tokio::test]
    async fn test_backend_name() {
        let manager = CacheManager::new(CacheConfig::new(), Box::new(NullCache::new()));
        assert_eq!(manager.backend_name(), "null");
    }
}
