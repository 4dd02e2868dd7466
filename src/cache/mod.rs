//! 响应缓存模块：按内容寻址缓存 AI 结果，避免重复调用。
//!
//! # Response Caching Module
//!
//! Content-addressed caching of validated AI responses. Identical requests for the same action
//! are answered from the cache regardless of which caller sends them, which keeps repeated
//! queries free for the user and off the provider.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | TTL policy, key prefixing and hit/miss statistics |
//! | [`CacheConfig`] | Configuration for cache behavior and limits |
//! | [`CacheBackend`] | Trait for custom backends (e.g. a shared store across processes) |
//! | [`MemoryCache`] | Unbounded in-memory map with lazy expiry sweep |
//! | [`NullCache`] | No-op cache for disabling caching |
//! | [`CacheKey`] | SHA-256 key derived from action tag and content |
//!
//! ## Example
//!
//! ```rust
//! use minutes_ai::cache::{CacheConfig, CacheKeyGenerator, CacheManager, MemoryCache};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let cache = CacheManager::new(
//!     CacheConfig::new().with_ttl(Duration::from_secs(3600)),
//!     Box::new(MemoryCache::new()),
//! );
//! let key = CacheKeyGenerator::new().generate("summary", &["Participants: A, B"]);
//! cache.set(&key, "- A and B attended").await.unwrap();
//! assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("- A and B attended"));
//! # });
//! ```

mod backend;
mod key;
mod manager;

pub use backend::{CacheBackend, MemoryCache, NullCache};
pub use key::{CacheKey, CacheKeyGenerator};
pub use manager::{CacheConfig, CacheManager, CacheStats};
