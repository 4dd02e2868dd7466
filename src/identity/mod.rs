//! 调用方身份解析：登录用户 id 或匿名 guest_id cookie。
//!
//! # Caller Identity
//!
//! Rate limits and debounce windows are tracked per [`IdentityKey`]. Authenticated callers are
//! keyed by their user id; anonymous callers get a random UUID stored in the `guest_id` cookie
//! for a year, so the key survives page reloads and browser restarts.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`IdentityResolver`] | Maps a request's user and cookies to an identity key |
//! | [`CookieJar`] | Request-scoped cookie access implemented by the host framework |
//! | [`Cookie`] | Cookie value plus attributes, renders a `Set-Cookie` header value |
//! | [`MemoryCookieJar`] | Map-backed jar for tests and the CLI |

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CookieConfig;
use crate::Result;

pub const GUEST_COOKIE_NAME: &str = "guest_id";
/// One year.
pub const GUEST_COOKIE_MAX_AGE_SECS: u64 = 31_536_000;

/// Key under which per-caller counters are stored.
///
/// Guests and users live in separate namespaces, so a guest token can never collide with a
/// user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum IdentityKey {
    Guest(String),
    User(String),
}

impl IdentityKey {
    pub fn guest(id: impl Into<String>) -> Self {
        IdentityKey::Guest(id.into())
    }

    pub fn user(id: impl Into<String>) -> Self {
        IdentityKey::User(id.into())
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, IdentityKey::Guest(_))
    }

    /// The raw token or user id without namespace.
    pub fn id(&self) -> &str {
        match self {
            IdentityKey::Guest(id) | IdentityKey::User(id) => id,
        }
    }

    /// Namespaced storage key, e.g. `guest:0b6f…` or `user:42`.
    pub fn storage_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Guest(id) => write!(f, "guest:{}", id),
            IdentityKey::User(id) => write!(f, "user:{}", id),
        }
    }
}

/// Caller established by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age_secs: Option<u64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            max_age_secs: None,
            http_only: false,
            secure: false,
            same_site: SameSite::Lax,
        }
    }

    /// The `guest_id` cookie with its fixed attributes.
    pub fn guest(value: impl Into<String>, config: &CookieConfig) -> Self {
        Self {
            max_age_secs: Some(GUEST_COOKIE_MAX_AGE_SECS),
            http_only: true,
            secure: config.secure,
            same_site: SameSite::Lax,
            ..Self::new(GUEST_COOKIE_NAME, value)
        }
    }

    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
        if let Some(max_age) = self.max_age_secs {
            out.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str("; SameSite=");
        out.push_str(self.same_site.as_str());
        out
    }
}

/// Request-scoped cookie access.
pub trait CookieJar: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, cookie: Cookie) -> Result<()>;
}

/// Map-backed jar. Records every cookie set so callers can emit `Set-Cookie` headers.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    values: Mutex<HashMap<String, String>>,
    set_cookies: Mutex<Vec<Cookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), value.into());
        self
    }

    /// Cookies set during the request, in order.
    pub fn set_cookies(&self) -> Vec<Cookie> {
        self.set_cookies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    fn set(&self, cookie: Cookie) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(cookie.name.clone(), cookie.value.clone());
        self.set_cookies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(cookie);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    cookie: CookieConfig,
}

impl IdentityResolver {
    pub fn new(cookie: CookieConfig) -> Self {
        Self { cookie }
    }

    /// Resolve the caller. Never fails: a guest without a usable cookie gets a fresh token,
    /// and a failed cookie write only costs the token's persistence.
    pub fn resolve(&self, jar: &dyn CookieJar, user: Option<&AuthenticatedUser>) -> IdentityKey {
        if let Some(user) = user {
            return IdentityKey::User(user.id.clone());
        }

        if let Some(existing) = jar.get(GUEST_COOKIE_NAME) {
            let existing = existing.trim();
            if !existing.is_empty() {
                return IdentityKey::Guest(existing.to_string());
            }
        }

        let token = Uuid::new_v4().to_string();
        if let Err(e) = jar.set(Cookie::guest(token.clone(), &self.cookie)) {
            tracing::warn!(error = %e, "failed to persist guest_id cookie");
        } else {
            tracing::debug!(guest_id = %token, "issued guest_id cookie");
        }
        IdentityKey::Guest(token)
    }
}
