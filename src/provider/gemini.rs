//! Gemini generateContent 客户端
//!
//! Google Gemini `generateContent` REST client:
//! - `POST {base}/v1beta/models/{model}:generateContent?key={api_key}`
//! - Request: `{ "contents": [{ "role": "user", "parts": [{ "text": prompt }] }] }`
//! - Response: `candidates[0].content.parts[*].text`, usage in `usageMetadata`.
//! - Errors: `{ "error": { "code", "message", "status" } }` with a non-2xx status.

use async_trait::async_trait;
use keyring::Entry;
use serde_json::Value;
use std::env;
use url::Url;

use crate::config::{ProviderConfig, ENV_GEMINI_API_KEY};
use crate::error::{Error, ErrorContext, TransportError};
use crate::Result;

use super::{classify_status, Generation, TextGenerator, UsageInfo};

const KEYRING_SERVICE: &str = "minutes-ai";
const KEYRING_USER: &str = "gemini";

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: Url,
    model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url.as_str())
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GeminiProvider {
    /// Build the client. A missing API key is not an error here; every `generate` call then
    /// fails with a configuration error instead.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid Gemini base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("GEMINI_BASE_URL")
                    .with_details(config.base_url.clone()),
            )
        })?;

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            api_key: Self::resolve_api_key(config),
        })
    }

    /// Explicit key, then (unless disabled) the OS keyring, then `GEMINI_API_KEY`.
    fn resolve_api_key(config: &ProviderConfig) -> Option<String> {
        if let Some(key) = config.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }
        if !config.key_fallbacks {
            return None;
        }

        if let Ok(entry) = Entry::new(KEYRING_SERVICE, KEYRING_USER) {
            if let Ok(key) = entry.get_password() {
                if !key.trim().is_empty() {
                    return Some(key);
                }
            }
        }

        env::var(ENV_GEMINI_API_KEY)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self, api_key: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("v1beta/models/{}:generateContent", self.model))
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid Gemini endpoint: {}", e),
                    ErrorContext::new().with_field_path("GEMINI_MODEL"),
                )
            })?;
        url.query_pairs_mut().append_pair("key", api_key);
        Ok(url)
    }

    pub(crate) fn build_body(prompt: &str) -> Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
        })
    }

    pub(crate) fn parse_response(&self, body: &Value) -> Result<Generation> {
        let text: String = body
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let reason = body
                .pointer("/candidates/0/finishReason")
                .or_else(|| body.pointer("/promptFeedback/blockReason"))
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates");
            return Err(Error::runtime_with_context(
                "Gemini returned no text",
                ErrorContext::new()
                    .with_details(reason.to_string())
                    .with_source("gemini_provider"),
            ));
        }

        let usage = body.get("usageMetadata").map(|u| UsageInfo {
            prompt_tokens: u["promptTokenCount"].as_u64().unwrap_or(0),
            completion_tokens: u["candidatesTokenCount"].as_u64().unwrap_or(0),
            total_tokens: u["totalTokenCount"].as_u64().unwrap_or(0),
        });

        let model = body
            .get("modelVersion")
            .and_then(|m| m.as_str())
            .unwrap_or(self.model.as_str())
            .to_string();

        Ok(Generation { text, model, usage })
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::configuration_with_context(
                "GEMINI_API_KEY is not configured",
                ErrorContext::new()
                    .with_field_path(ENV_GEMINI_API_KEY)
                    .with_source("gemini_provider"),
            )
        })?;

        let response = self
            .client
            .post(self.endpoint(api_key)?)
            .json(&Self::build_body(prompt))
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        if !status.is_success() {
            let (class, retryable) = classify_status(status.as_u16());
            let message = serde_json::from_str::<Value>(&raw)
                .ok()
                .and_then(|b| b.pointer("/error/message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| format!("request failed: {}", status));
            return Err(Error::Remote {
                status: status.as_u16(),
                class: class.to_string(),
                message,
                retryable,
            });
        }

        let body: Value = serde_json::from_str(&raw)?;
        let generation = self.parse_response(&body)?;
        if let Some(usage) = &generation.usage {
            tracing::debug!(
                model = %generation.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "gemini generation finished"
            );
        }
        Ok(generation)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(&ProviderConfig::default().with_api_key("k")).unwrap()
    }

    #[test]
    fn test_build_body() {
        let body = GeminiProvider::build_body("hello");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_endpoint() {
        let url = provider().endpoint("secret").unwrap();
        assert_eq!(
            url.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent?key=secret"
        );
    }

    #[test]
    fn test_endpoint_with_base_path() {
        let cfg = ProviderConfig::default()
            .with_api_key("k")
            .with_base_url("http://localhost:8080/proxy");
        let url = GeminiProvider::new(&cfg).unwrap().endpoint("k").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/proxy/v1beta/models/gemini-2.5-flash:generateContent?key=k"
        );
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{"text": "- A"}, {"text": "\n- B"}], "role": "model" },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 5,
                "candidatesTokenCount": 3,
                "totalTokenCount": 8
            }
        });
        let generation = provider().parse_response(&body).unwrap();
        assert_eq!(generation.text, "- A\n- B");
        assert_eq!(generation.model, "gemini-2.5-flash");
        assert_eq!(generation.usage.unwrap().total_tokens, 8);
    }

    #[test]
    fn test_parse_response_without_text() {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "SAFETY" }]
        });
        let err = provider().parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_invalid_base_url() {
        let cfg = ProviderConfig::default().with_base_url("not a url");
        assert!(matches!(
            GeminiProvider::new(&cfg),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", provider());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("\"k\""));
    }
}
