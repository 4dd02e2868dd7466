//! 调用节流模块：按身份的每日限额与防连点（debounce）存储。
//!
//! # Invocation Throttling Stores
//!
//! Per-identity state consulted by the guard layer before a provider call.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter`] | Daily invocation counter keyed by identity and UTC date |
//! | [`debounce`] | Last accepted execution time per identity |
//! | [`sweep`] | Throttled, access-triggered cleanup policy shared by the stores |
//!
//! Both stores are traits so that a shared backend can replace the in-memory maps in a
//! multi-process deployment. The in-memory implementations sweep lazily: stale entries are
//! removed during a regular access at most once per interval.
//!
//! ```rust
//! use minutes_ai::resilience::{MemoryRateLimitStore, RateLimitStore};
//! use chrono::Utc;
//!
//! # tokio_test::block_on(async {
//! let store = MemoryRateLimitStore::new();
//! let now = Utc::now();
//! store.increment("guest:abc", now).await.unwrap();
//! assert_eq!(store.count("guest:abc", now).await.unwrap(), 1);
//! # });
//! ```

pub mod debounce;
pub mod rate_limiter;
pub mod sweep;

pub use debounce::{remaining_wait, DebounceStore, MemoryDebounceStore};
pub use rate_limiter::{MemoryRateLimitStore, RateLimitEntry, RateLimitStore};
pub use sweep::SweepSchedule;
