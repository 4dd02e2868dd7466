//! Environment-driven configuration.
//!
//! Every section can be built from the process environment (`from_env`) or from an arbitrary
//! key lookup (`from_lookup`), which keeps tests away from global env mutation. Unparseable
//! values fall back to the default and are reported with a warning.

use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_RAW_TEXT_MAX_CHARS: &str = "AI_RAW_TEXT_MAX_CHARS";
pub const ENV_QUESTION_MAX_CHARS: &str = "AI_QUESTION_MAX_CHARS";
pub const ENV_RATE_LIMIT_PER_DAY: &str = "AI_RATE_LIMIT_PER_DAY";
pub const ENV_DEBOUNCE_SECONDS: &str = "AI_DEBOUNCE_SECONDS";
pub const ENV_CACHE_TTL_SECONDS: &str = "AI_CACHE_TTL_SECONDS";

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "AI_HTTP_TIMEOUT_SECS";

pub const ENV_APP_ENV: &str = "APP_ENV";
pub const ENV_DEFAULT_DEPARTMENT_ID: &str = "DEFAULT_DEPARTMENT_ID";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) if raw.trim().is_empty() => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparseable configuration value");
                default
            }
        },
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Limits and windows applied by the guard layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Ceiling for document text, in characters.
    pub raw_text_max_chars: usize,
    /// Ceiling for the question of the Q&A action, in characters.
    pub question_max_chars: usize,
    /// Allowed non-cached invocations per identity and UTC day.
    pub rate_limit_per_day: u32,
    /// Minimum spacing between two accepted invocations of one identity.
    pub debounce: Duration,
    /// Lifetime of a cached provider response. Always at least one second.
    pub cache_ttl: Duration,
    /// Remove cache entries that fail validation on read.
    pub evict_corrupt_entries: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            raw_text_max_chars: 30_000,
            question_max_chars: 800,
            rate_limit_per_day: 10,
            debounce: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(86_400),
            evict_corrupt_entries: true,
        }
    }
}

impl GuardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            raw_text_max_chars: parse_or(&lookup, ENV_RAW_TEXT_MAX_CHARS, d.raw_text_max_chars),
            question_max_chars: parse_or(&lookup, ENV_QUESTION_MAX_CHARS, d.question_max_chars),
            rate_limit_per_day: parse_or(&lookup, ENV_RATE_LIMIT_PER_DAY, d.rate_limit_per_day),
            debounce: Duration::from_secs(parse_or(
                &lookup,
                ENV_DEBOUNCE_SECONDS,
                d.debounce.as_secs(),
            )),
            cache_ttl: Duration::from_secs(
                parse_or(&lookup, ENV_CACHE_TTL_SECONDS, d.cache_ttl.as_secs()).max(1),
            ),
            evict_corrupt_entries: d.evict_corrupt_entries,
        }
    }

    pub fn with_raw_text_max_chars(mut self, n: usize) -> Self {
        self.raw_text_max_chars = n;
        self
    }

    pub fn with_question_max_chars(mut self, n: usize) -> Self {
        self.question_max_chars = n;
        self
    }

    pub fn with_rate_limit_per_day(mut self, n: u32) -> Self {
        self.rate_limit_per_day = n;
        self
    }

    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl.max(Duration::from_secs(1));
        self
    }

    pub fn with_evict_corrupt_entries(mut self, enabled: bool) -> Self {
        self.evict_corrupt_entries = enabled;
        self
    }
}

/// Settings of the Gemini text generation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Explicit key. When absent the provider reads the OS keyring, then `GEMINI_API_KEY`.
    pub api_key: Option<String>,
    /// Whether the keyring and `GEMINI_API_KEY` are consulted when `api_key` is absent.
    pub key_fallbacks: bool,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            key_fallbacks: true,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            api_key: None,
            key_fallbacks: d.key_fallbacks,
            model: non_empty(&lookup, ENV_GEMINI_MODEL).unwrap_or(d.model),
            base_url: non_empty(&lookup, ENV_GEMINI_BASE_URL).unwrap_or(d.base_url),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                ENV_HTTP_TIMEOUT_SECS,
                d.timeout.as_secs(),
            )),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_key_fallbacks(mut self, enabled: bool) -> Self {
        self.key_fallbacks = enabled;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Attributes of the guest identity cookie that depend on the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CookieConfig {
    /// Mark the cookie `Secure`. Enabled when `APP_ENV=production`.
    pub secure: bool,
}

impl CookieConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secure = non_empty(&lookup, ENV_APP_ENV)
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        Self { secure }
    }
}

/// Settings of the minutes persistence service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinutesConfig {
    /// Department assigned to freshly created profiles.
    pub default_department_id: Option<String>,
    /// Ceiling for the stored raw text, in characters.
    pub raw_text_max_chars: usize,
    pub audio_max_bytes: u64,
    pub audio_mime_type: String,
}

impl Default for MinutesConfig {
    fn default() -> Self {
        Self {
            default_department_id: None,
            raw_text_max_chars: 30_000,
            audio_max_bytes: 20 * 1024 * 1024,
            audio_mime_type: "audio/mp4".to_string(),
        }
    }
}

impl MinutesConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            default_department_id: non_empty(&lookup, ENV_DEFAULT_DEPARTMENT_ID),
            ..Self::default()
        }
    }

    pub fn with_default_department_id(mut self, id: impl Into<String>) -> Self {
        self.default_department_id = Some(id.into());
        self
    }
}
