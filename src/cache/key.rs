//! Cache key generation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content-addressed key of a cached provider response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
    /// Action tag the key was derived for (diagnostics only, not part of the identity).
    pub tag: Option<String>,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self { Self { hash: hash.into(), tag: None } }
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self { self.tag = Some(tag.into()); self }
    pub fn as_str(&self) -> &str { &self.hash }

    /// Short prefix used in log lines.
    pub fn short(&self) -> &str { self.hash.get(..12).unwrap_or(&self.hash) }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.hash) }
}

impl From<&str> for CacheKey { fn from(s: &str) -> Self { Self::new(s) } }
impl From<String> for CacheKey { fn from(s: String) -> Self { Self::new(s) } }

/// Derives SHA-256 keys from an action tag and the request content.
///
/// Each part is length-prefixed so that `("ab", "c")` and `("a", "bc")` never collide, and the
/// tag keeps identical text submitted to different actions apart. Content is hashed verbatim:
/// the same text from any caller maps to the same key.
pub struct CacheKeyGenerator {
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new() -> Self { Self { salt: None } }
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self { self.salt = Some(salt.into()); self }

    pub fn generate(&self, tag: &str, parts: &[&str]) -> CacheKey {
        let mut hasher = Sha256::new();
        if let Some(ref s) = self.salt {
            hasher.update((s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        hasher.update((tag.len() as u64).to_le_bytes());
        hasher.update(tag.as_bytes());
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        let hash: String = hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect();
        CacheKey::new(hash).with_tag(tag)
    }
}

impl Default for CacheKeyGenerator { fn default() -> Self { Self::new() } }
