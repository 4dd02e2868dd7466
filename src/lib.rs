//! # minutes-ai
//!
//! 议事录应用的 AI 调用守卫层：限额、防连点、缓存与响应校验。
//!
//! Guard layer for the AI features of a meeting-minutes application. Every call to the
//! generative provider is wrapped in per-identity daily rate limiting, anti-double-submit
//! debouncing and a content-addressed response cache, and every answer is validated before it
//! reaches the caller.
//!
//! ## Overview
//!
//! - **Three actions**: summarize minutes, extract action items with evidence, answer a question
//!   strictly from the minutes.
//! - **One guard**: [`AiGuard`] runs the same ordered checks for every action; cache hits are
//!   free and never debounced.
//! - **Pluggable stores**: cache, rate-limit and debounce state sit behind traits with
//!   process-local defaults.
//! - **Uniform responses**: the UI layer receives `{success, ..., error}` with localized
//!   messages, never a raw error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use minutes_ai::{AiGuard, GeminiProvider, MinutesAssistant};
//! use minutes_ai::config::{GuardConfig, ProviderConfig};
//! use minutes_ai::identity::{IdentityResolver, MemoryCookieJar};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> minutes_ai::Result<()> {
//!     let provider = GeminiProvider::new(&ProviderConfig::from_env())?;
//!     let guard = AiGuard::builder(Arc::new(provider))
//!         .with_config(GuardConfig::from_env())
//!         .build();
//!     let assistant = MinutesAssistant::new(Arc::new(guard), IdentityResolver::default());
//!
//!     let jar = MemoryCookieJar::new();
//!     let who = assistant.identify(&jar, None);
//!     let resp = assistant.summarize(&who, "Attendees: A, B. Decided to ship Friday.").await;
//!     println!("{}", serde_json::to_string_pretty(&resp)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`guard`] | Ordered checks around every provider call |
//! | [`actions`] | Summarize / extract / ask, and the response envelope |
//! | [`cache`] | Content-addressed response cache with pluggable backends |
//! | [`resilience`] | Daily rate limit and debounce stores |
//! | [`identity`] | Guest cookie and authenticated identity keys |
//! | [`provider`] | Text generation trait, Gemini client, prompts |
//! | [`structured`] | JSON extraction and response validators |
//! | [`minutes`] | Persistence of minutes, action items and recordings |
//! | [`config`] | Environment-driven settings |
//! | [`clock`] | Injectable time source |

pub mod actions;
pub mod cache;
pub mod clock;
pub mod config;
pub mod guard;
pub mod identity;
pub mod minutes;
pub mod provider;
pub mod resilience;
pub mod structured;

pub mod error;
pub use error::{Error, ErrorContext};

pub use actions::{ActionResponse, MinutesAssistant};
pub use guard::{AiGuard, AiGuardBuilder, GuardError};
pub use identity::{IdentityKey, IdentityResolver};
pub use minutes::MinutesService;
pub use provider::{GeminiProvider, Generation, TextGenerator};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
