//! 文本生成提供方抽象：通过 trait 对接外部生成式 AI
//!
//! Text generation provider abstraction. The guard layer only needs "prompt in, text out";
//! everything vendor-specific (authentication, endpoints, response envelopes) stays behind
//! [`TextGenerator`], which is object-safe and used as `Arc<dyn TextGenerator>`.

pub mod gemini;
pub mod prompts;

use async_trait::async_trait;

use crate::Result;

pub use gemini::GeminiProvider;

/// Token usage information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Single-shot completion result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Concatenated text of the first candidate.
    pub text: String,
    /// Model that produced the text.
    pub model: String,
    pub usage: Option<UsageInfo>,
}

impl Generation {
    pub fn new(text: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            usage: None,
        }
    }
}

/// Core trait for generative text backends.
///
/// Implementations fail with [`crate::Error::Configuration`] when credentials are missing and
/// with [`crate::Error::Remote`] / [`crate::Error::Transport`] for HTTP level failures. They
/// never retry.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Generation>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

/// Map an HTTP status to an error class and whether retrying later may help.
pub fn classify_status(status: u16) -> (&'static str, bool) {
    match status {
        400 => ("invalid_request", false),
        401 => ("authentication", false),
        403 => ("permission_denied", false),
        404 => ("not_found", false),
        413 => ("request_too_large", false),
        429 => ("rate_limited", true),
        503 | 529 => ("overloaded", true),
        500..=599 => ("server_error", true),
        _ => ("other", false),
    }
}
