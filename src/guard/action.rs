use serde::Serialize;
use serde_json::Value;

use crate::structured::ValidationError;

use super::error::InputField;

/// The three AI actions offered over minutes text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Summarize,
    ExtractActions,
    AnswerQuestion,
}

impl ActionKind {
    /// Tag mixed into the cache key and used as the `action` log field.
    pub fn tag(&self) -> &'static str {
        match self {
            ActionKind::Summarize => "summary",
            ActionKind::ExtractActions => "actions",
            ActionKind::AnswerQuestion => "qa",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A request the guard can run: its inputs, its prompt and how to read the answer.
///
/// `decode` is applied both to fresh provider output and to cache hits, so a cached value is
/// always the serialized `Output` of an earlier successful decode.
pub trait GuardedAction: Send + Sync {
    type Output: Serialize + Send;

    fn kind(&self) -> ActionKind;

    /// Fields subject to size and emptiness checks, in check order.
    fn inputs(&self) -> Vec<(InputField, &str)>;

    /// Content the cache key is derived from. Hashed verbatim.
    fn cache_parts(&self) -> Vec<&str>;

    fn prompt(&self) -> String;

    /// Turn model text into a JSON candidate.
    fn parse(&self, text: &str) -> Result<Value, serde_json::Error>;

    /// Validate a candidate and convert it into the typed output.
    fn decode(&self, candidate: Value) -> Result<Self::Output, ValidationError>;
}
