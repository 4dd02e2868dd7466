//! AI 调用守卫：限额、防连点与缓存包裹每一次提供方调用。
//!
//! # AI Invocation Guard
//!
//! Every call to the text generation provider goes through [`AiGuard::invoke`], which applies
//! the following steps in order and stops at the first failure:
//!
//! | Step | Check | Failure |
//! |------|-------|---------|
//! | 1 | each input within its character ceiling | [`GuardError::InputTooLarge`] |
//! | 2 | each input non-blank | [`GuardError::EmptyInput`] |
//! | 3 | identity below today's invocation limit | [`GuardError::RateLimitExceeded`] |
//! | 4 | cache lookup; a valid hit is returned at once | – |
//! | 5 | debounce window since the last accepted call | [`GuardError::TooFrequent`] |
//! | 6 | provider call | [`GuardError::Provider`] |
//! | 7 | response parsing | [`GuardError::MalformedResponse`] |
//! | 8 | response validation | [`GuardError::InvalidResponse`] |
//! | 9 | commit cache entry, counter and debounce timestamp | – |
//!
//! Cache hits consume no rate-limit slot and skip the debounce check. Steps 3–5 run under the
//! shared side of a gate and step 9 under its exclusive side, so no caller observes a partial
//! commit. Concurrent identical misses are not coalesced: both reach the provider and the last
//! commit wins.
//!
//! ```rust
//! use async_trait::async_trait;
//! use minutes_ai::actions::Summarize;
//! use minutes_ai::guard::AiGuard;
//! use minutes_ai::identity::IdentityKey;
//! use minutes_ai::provider::{Generation, TextGenerator};
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl TextGenerator for Echo {
//!     async fn generate(&self, _prompt: &str) -> minutes_ai::Result<Generation> {
//!         Ok(Generation::new("- A and B attended", "echo"))
//!     }
//!     fn name(&self) -> &str { "echo" }
//! }
//!
//! # tokio_test::block_on(async {
//! let guard = AiGuard::builder(Arc::new(Echo)).build();
//! let who = IdentityKey::guest("demo");
//! let summary = guard.invoke(&who, &Summarize::new("Participants: A, B")).await.unwrap();
//! assert_eq!(summary, "- A and B attended");
//! assert_eq!(guard.remaining_today(&who).await.unwrap(), 9);
//! # });
//! ```

mod action;
mod error;

pub use action::{ActionKind, GuardedAction};
pub use error::{group_thousands, GuardError, InputField, GENERIC_FAILURE_MESSAGE};

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::{CacheBackend, CacheConfig, CacheKey, CacheKeyGenerator, CacheManager, CacheStats, MemoryCache};
use crate::clock::{system_clock, Clock};
use crate::config::GuardConfig;
use crate::identity::IdentityKey;
use crate::provider::TextGenerator;
use crate::resilience::{remaining_wait, DebounceStore, MemoryDebounceStore, MemoryRateLimitStore, RateLimitStore};

/// Builder for [`AiGuard`]. Unset stores default to the in-memory implementations.
pub struct AiGuardBuilder {
    provider: Arc<dyn TextGenerator>,
    config: GuardConfig,
    clock: Option<Arc<dyn Clock>>,
    cache: Option<Box<dyn CacheBackend>>,
    rate_limits: Option<Arc<dyn RateLimitStore>>,
    debounce: Option<Arc<dyn DebounceStore>>,
}

impl AiGuardBuilder {
    pub fn new(provider: Arc<dyn TextGenerator>) -> Self {
        Self {
            provider,
            config: GuardConfig::default(),
            clock: None,
            cache: None,
            rate_limits: None,
            debounce: None,
        }
    }

    pub fn with_config(mut self, config: GuardConfig) -> Self {
        self.config = config;
        self
    }

    /// Time source for windows, expiry and calendar days. Also drives the default cache.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_cache_backend(mut self, backend: Box<dyn CacheBackend>) -> Self {
        self.cache = Some(backend);
        self
    }

    pub fn with_rate_limit_store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.rate_limits = Some(store);
        self
    }

    pub fn with_debounce_store(mut self, store: Arc<dyn DebounceStore>) -> Self {
        self.debounce = Some(store);
        self
    }

    pub fn build(self) -> AiGuard {
        let clock = self.clock.unwrap_or_else(system_clock);
        let debounce_window = to_chrono(self.config.debounce);
        let backend = self
            .cache
            .unwrap_or_else(|| Box::new(MemoryCache::with_clock(clock.clone())));
        let cache = CacheManager::new(
            CacheConfig::new().with_ttl(self.config.cache_ttl),
            backend,
        );

        AiGuard {
            provider: self.provider,
            cache,
            keys: CacheKeyGenerator::new(),
            rate_limits: self
                .rate_limits
                .unwrap_or_else(|| Arc::new(MemoryRateLimitStore::new())),
            debounce: self
                .debounce
                .unwrap_or_else(|| Arc::new(MemoryDebounceStore::new(debounce_window))),
            debounce_window,
            clock,
            config: self.config,
            gate: RwLock::new(()),
        }
    }
}

/// Rate limit, debounce and response cache around a [`TextGenerator`].
pub struct AiGuard {
    provider: Arc<dyn TextGenerator>,
    config: GuardConfig,
    clock: Arc<dyn Clock>,
    cache: CacheManager,
    keys: CacheKeyGenerator,
    rate_limits: Arc<dyn RateLimitStore>,
    debounce: Arc<dyn DebounceStore>,
    debounce_window: chrono::Duration,
    gate: RwLock<()>,
}

impl AiGuard {
    pub fn builder(provider: Arc<dyn TextGenerator>) -> AiGuardBuilder {
        AiGuardBuilder::new(provider)
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Non-cached invocations `identity` may still make today.
    pub async fn remaining_today(&self, identity: &IdentityKey) -> crate::Result<u32> {
        let used = self
            .rate_limits
            .count(&identity.storage_key(), self.clock.now())
            .await?;
        Ok(self.config.rate_limit_per_day.saturating_sub(used))
    }

    /// Run `action` for `identity`. See the module docs for the step order.
    pub async fn invoke<A: GuardedAction>(
        &self,
        identity: &IdentityKey,
        action: &A,
    ) -> Result<A::Output, GuardError> {
        let kind = action.kind();
        let who = identity.storage_key();

        self.check_inputs(action)?;
        let key = self.keys.generate(kind.tag(), &action.cache_parts());

        {
            let _shared = self.gate.read().await;
            let now = self.clock.now();

            let used = self.rate_limits.count(&who, now).await.map_err(GuardError::Store)?;
            if used >= self.config.rate_limit_per_day {
                tracing::info!(action = kind.tag(), identity = %identity, used, "daily limit reached");
                return Err(GuardError::RateLimitExceeded {
                    limit: self.config.rate_limit_per_day,
                });
            }

            if let Some(hit) = self.lookup(action, &key).await? {
                tracing::info!(action = kind.tag(), identity = %identity, cache_key = key.short(), "cache hit");
                return Ok(hit);
            }

            let last = self.debounce.last_execution(&who, now).await.map_err(GuardError::Store)?;
            if let Some(wait) = remaining_wait(last, now, self.debounce_window) {
                let retry_after_secs = ceil_secs(wait);
                tracing::info!(action = kind.tag(), identity = %identity, retry_after_secs, "debounced");
                return Err(GuardError::TooFrequent { retry_after_secs });
            }
        }

        let generation = self.provider.generate(&action.prompt()).await.map_err(|e| {
            tracing::warn!(action = kind.tag(), identity = %identity, provider = self.provider.name(), error = %e, "provider call failed");
            GuardError::Provider(e)
        })?;

        let candidate = action.parse(&generation.text).map_err(|e| {
            tracing::warn!(action = kind.tag(), error = %e, response = %generation.text, "unparseable provider response");
            GuardError::MalformedResponse { detail: e.to_string() }
        })?;

        let output = action.decode(candidate).map_err(|e| {
            tracing::warn!(action = kind.tag(), error = %e, response = %generation.text, "provider response failed validation");
            GuardError::InvalidResponse { detail: e.to_string() }
        })?;

        let encoded = serde_json::to_string(&output).map_err(|e| GuardError::Store(e.into()))?;
        {
            let _exclusive = self.gate.write().await;
            let now = self.clock.now();
            self.cache
                .set_with_ttl(&key, &encoded, self.config.cache_ttl)
                .await
                .map_err(GuardError::Store)?;
            let used = self.rate_limits.increment(&who, now).await.map_err(GuardError::Store)?;
            self.debounce.touch(&who, now).await.map_err(GuardError::Store)?;
            tracing::info!(
                action = kind.tag(),
                identity = %identity,
                cache_key = key.short(),
                model = %generation.model,
                used,
                "committed provider result"
            );
        }

        Ok(output)
    }

    fn check_inputs<A: GuardedAction>(&self, action: &A) -> Result<(), GuardError> {
        let inputs = action.inputs();
        for (field, text) in &inputs {
            let limit = self.limit_for(*field);
            if text.chars().count() > limit {
                tracing::debug!(action = %action.kind(), field = %field, limit, "input too large");
                return Err(GuardError::InputTooLarge { field: *field, limit });
            }
        }
        for (field, text) in &inputs {
            if text.trim().is_empty() {
                return Err(GuardError::EmptyInput { field: *field });
            }
        }
        Ok(())
    }

    fn limit_for(&self, field: InputField) -> usize {
        match field {
            InputField::RawText | InputField::QuestionContext => self.config.raw_text_max_chars,
            InputField::Question => self.config.question_max_chars,
        }
    }

    /// Decode a cache hit. A stored value that no longer decodes is treated as a miss and,
    /// unless disabled, evicted.
    async fn lookup<A: GuardedAction>(&self, action: &A, key: &CacheKey) -> Result<Option<A::Output>, GuardError> {
        let Some(raw) = self.cache.get(key).await.map_err(GuardError::Store)? else {
            tracing::debug!(action = %action.kind(), cache_key = key.short(), "cache miss");
            return Ok(None);
        };

        let decoded = serde_json::from_str::<serde_json::Value>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|value| action.decode(value).map_err(|e| e.to_string()));

        match decoded {
            Ok(output) => Ok(Some(output)),
            Err(detail) => {
                tracing::warn!(action = %action.kind(), cache_key = key.short(), error = %detail, "corrupt cache entry");
                self.cache.record_corrupt();
                if self.config.evict_corrupt_entries {
                    self.cache.evict(key).await.map_err(GuardError::Store)?;
                }
                Ok(None)
            }
        }
    }
}

fn to_chrono(d: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::days(365))
}

/// Whole seconds, rounded up, never zero.
fn ceil_secs(wait: chrono::Duration) -> u64 {
    let ms = wait.num_milliseconds().max(0) as u64;
    ms.div_ceil(1000).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(chrono::Duration::milliseconds(1)), 1);
        assert_eq!(ceil_secs(chrono::Duration::milliseconds(1000)), 1);
        assert_eq!(ceil_secs(chrono::Duration::milliseconds(1001)), 2);
        assert_eq!(ceil_secs(chrono::Duration::seconds(30)), 30);
        assert_eq!(ceil_secs(chrono::Duration::zero()), 1);
    }

    #[test]
    fn test_action_tags_are_distinct() {
        let tags = [
            ActionKind::Summarize.tag(),
            ActionKind::ExtractActions.tag(),
            ActionKind::AnswerQuestion.tag(),
        ];
        assert_eq!(tags, ["summary", "actions", "qa"]);
    }
}
