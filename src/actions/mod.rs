//! 议事录 AI 操作：摘要、行动项抽取、问答。
//!
//! # Minutes AI Actions
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Summarize`] | Bullet summary of decisions, topics and next steps |
//! | [`ExtractActions`] | Action items, each with the passage it was taken from |
//! | [`AnswerQuestion`] | Answer plus evidence, restricted to what the minutes say |
//! | [`MinutesAssistant`] | Runs the actions through the guard and shapes [`ActionResponse`]s |
//!
//! The assistant never fails: every guard outcome becomes either a payload or a localized
//! error message.

mod response;

pub use response::{ActionResponse, Empty};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::guard::{ActionKind, AiGuard, GuardError, GuardedAction, InputField};
use crate::identity::{AuthenticatedUser, CookieJar, IdentityKey, IdentityResolver};
use crate::provider::prompts;
use crate::structured::{
    decode_action_items, decode_qa_answer, decode_summary, parse_json, ActionItem, QaAnswer,
    ValidationError,
};

#[derive(Debug, Clone)]
pub struct Summarize {
    pub raw_text: String,
}

impl Summarize {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }
}

impl GuardedAction for Summarize {
    type Output = String;

    fn kind(&self) -> ActionKind {
        ActionKind::Summarize
    }

    fn inputs(&self) -> Vec<(InputField, &str)> {
        vec![(InputField::RawText, self.raw_text.as_str())]
    }

    fn cache_parts(&self) -> Vec<&str> {
        vec![self.raw_text.as_str()]
    }

    fn prompt(&self) -> String {
        prompts::summary_prompt(&self.raw_text)
    }

    // summaries are plain text
    fn parse(&self, text: &str) -> Result<Value, serde_json::Error> {
        Ok(Value::String(text.trim().to_string()))
    }

    fn decode(&self, candidate: Value) -> Result<String, ValidationError> {
        decode_summary(candidate)
    }
}

#[derive(Debug, Clone)]
pub struct ExtractActions {
    pub raw_text: String,
}

impl ExtractActions {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }
}

impl GuardedAction for ExtractActions {
    type Output = Vec<ActionItem>;

    fn kind(&self) -> ActionKind {
        ActionKind::ExtractActions
    }

    fn inputs(&self) -> Vec<(InputField, &str)> {
        vec![(InputField::RawText, self.raw_text.as_str())]
    }

    fn cache_parts(&self) -> Vec<&str> {
        vec![self.raw_text.as_str()]
    }

    fn prompt(&self) -> String {
        prompts::action_extraction_prompt(&self.raw_text)
    }

    fn parse(&self, text: &str) -> Result<Value, serde_json::Error> {
        parse_json(text)
    }

    fn decode(&self, candidate: Value) -> Result<Vec<ActionItem>, ValidationError> {
        decode_action_items(candidate)
    }
}

#[derive(Debug, Clone)]
pub struct AnswerQuestion {
    pub raw_text: String,
    pub question: String,
}

impl AnswerQuestion {
    pub fn new(raw_text: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            question: question.into(),
        }
    }
}

impl GuardedAction for AnswerQuestion {
    type Output = QaAnswer;

    fn kind(&self) -> ActionKind {
        ActionKind::AnswerQuestion
    }

    fn inputs(&self) -> Vec<(InputField, &str)> {
        vec![
            (InputField::QuestionContext, self.raw_text.as_str()),
            (InputField::Question, self.question.as_str()),
        ]
    }

    fn cache_parts(&self) -> Vec<&str> {
        vec![self.raw_text.as_str(), self.question.as_str()]
    }

    fn prompt(&self) -> String {
        prompts::qa_prompt(&self.raw_text, &self.question)
    }

    fn parse(&self, text: &str) -> Result<Value, serde_json::Error> {
        parse_json(text)
    }

    fn decode(&self, candidate: Value) -> Result<QaAnswer, ValidationError> {
        decode_qa_answer(candidate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsPayload {
    pub actions: Vec<ActionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPayload {
    pub result: QaAnswer,
}

/// Entry point of the UI layer for the three AI actions.
#[derive(Clone)]
pub struct MinutesAssistant {
    guard: Arc<AiGuard>,
    identities: IdentityResolver,
}

impl MinutesAssistant {
    pub fn new(guard: Arc<AiGuard>, identities: IdentityResolver) -> Self {
        Self { guard, identities }
    }

    pub fn guard(&self) -> &AiGuard {
        &self.guard
    }

    /// Identity key of the current request. May set the `guest_id` cookie.
    pub fn identify(&self, jar: &dyn CookieJar, user: Option<&AuthenticatedUser>) -> IdentityKey {
        self.identities.resolve(jar, user)
    }

    pub async fn summarize(&self, identity: &IdentityKey, raw_text: &str) -> ActionResponse<SummaryPayload> {
        let outcome = self.guard.invoke(identity, &Summarize::new(raw_text)).await;
        respond(outcome.map(|summary| SummaryPayload { summary }))
    }

    pub async fn extract_actions(&self, identity: &IdentityKey, raw_text: &str) -> ActionResponse<ActionsPayload> {
        let outcome = self.guard.invoke(identity, &ExtractActions::new(raw_text)).await;
        respond(outcome.map(|actions| ActionsPayload { actions }))
    }

    pub async fn answer_question(
        &self,
        identity: &IdentityKey,
        raw_text: &str,
        question: &str,
    ) -> ActionResponse<QaPayload> {
        let outcome = self
            .guard
            .invoke(identity, &AnswerQuestion::new(raw_text, question))
            .await;
        respond(outcome.map(|result| QaPayload { result }))
    }
}

fn respond<T>(outcome: Result<T, GuardError>) -> ActionResponse<T> {
    match outcome {
        Ok(payload) => ActionResponse::ok(payload),
        Err(e) => {
            tracing::debug!(kind = e.kind(), error = %e, "guarded action rejected");
            ActionResponse::fail(e.user_message())
        }
    }
}
