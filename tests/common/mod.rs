//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use minutes_ai::cache::{CacheBackend, CacheKey, MemoryCache};
use minutes_ai::clock::ManualClock;
use minutes_ai::config::GuardConfig;
use minutes_ai::provider::{Generation, TextGenerator};
use minutes_ai::{AiGuard, Error, ErrorContext};

/// Provider that replays canned replies and counts calls. The last reply repeats.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Self::script(vec![Ok(text.to_string())])
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::script(vec![Err(message.to_string())])
    }

    pub fn script(replies: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedProvider {
    async fn generate(&self, _prompt: &str) -> minutes_ai::Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        let reply = match next {
            Some(r) => {
                *self.last.lock().unwrap() = Some(r.clone());
                r
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err("no scripted reply".into())),
        };
        match reply {
            Ok(text) => Ok(Generation::new(text, "scripted")),
            Err(msg) => Err(Error::runtime_with_context(
                msg,
                ErrorContext::new().with_source("scripted"),
            )),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Cache backend whose contents the test can reach after handing it to the guard.
#[derive(Clone)]
pub struct SharedCache(pub Arc<MemoryCache>);

#[async_trait]
impl CacheBackend for SharedCache {
    async fn get(&self, key: &CacheKey) -> minutes_ai::Result<Option<String>> {
        self.0.get(key).await
    }
    async fn set(&self, key: &CacheKey, value: &str, ttl: Duration) -> minutes_ai::Result<()> {
        self.0.set(key, value, ttl).await
    }
    async fn delete(&self, key: &CacheKey) -> minutes_ai::Result<bool> {
        self.0.delete(key).await
    }
    async fn exists(&self, key: &CacheKey) -> minutes_ai::Result<bool> {
        self.0.exists(key).await
    }
    async fn sweep(&self) -> minutes_ai::Result<usize> {
        self.0.sweep().await
    }
    async fn clear(&self) -> minutes_ai::Result<()> {
        self.0.clear().await
    }
    async fn len(&self) -> minutes_ai::Result<usize> {
        self.0.len().await
    }
    fn name(&self) -> &'static str {
        "shared"
    }
}

/// 2025-12-19 09:00:00 UTC.
pub fn morning_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2025, 12, 19, 9, 0, 0).unwrap())
}

pub fn config(limit: u32, debounce_secs: u64) -> GuardConfig {
    GuardConfig::default()
        .with_rate_limit_per_day(limit)
        .with_debounce(Duration::from_secs(debounce_secs))
}

pub fn guard_with(provider: Arc<ScriptedProvider>, clock: &ManualClock, config: GuardConfig) -> AiGuard {
    AiGuard::builder(provider)
        .with_config(config)
        .with_clock(Arc::new(clock.clone()))
        .build()
}
