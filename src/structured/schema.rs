//! Typed payloads of the three AI actions.
//!
//! The `decode_*` functions are the only way provider output becomes a typed value: each runs
//! the matching shape check first and converts only what passed.

use crate::structured::error::ValidationError;
use crate::structured::validator::{check_action_items, check_qa_answer, check_summary};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One task extracted from the minutes, with the sentence it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub task_content: String,
    pub assignee_name: Option<String>,
    pub due_at: Option<String>,
    pub note: Option<String>,
    pub evidence: String,
}

/// Answer to a question about the minutes, grounded in a quoted passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaAnswer {
    pub answer: String,
    pub evidence: String,
}

pub fn decode_summary(candidate: Value) -> Result<String, ValidationError> {
    match candidate {
        Value::String(text) => {
            check_summary(&text)?;
            Ok(text)
        }
        _ => Err(ValidationError::without_path("expected a string")),
    }
}

pub fn decode_action_items(candidate: Value) -> Result<Vec<ActionItem>, ValidationError> {
    check_action_items(&candidate)?;
    serde_json::from_value(candidate).map_err(|e| ValidationError::without_path(e.to_string()))
}

pub fn decode_qa_answer(candidate: Value) -> Result<QaAnswer, ValidationError> {
    check_qa_answer(&candidate)?;
    serde_json::from_value(candidate).map_err(|e| ValidationError::without_path(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_items_conversion() {
        let items = decode_action_items(json!([{
            "task_content": "Book room",
            "assignee_name": null,
            "due_at": "2025-12-24",
            "note": null,
            "evidence": "We need a room on the 24th"
        }]))
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].due_at.as_deref(), Some("2025-12-24"));
        assert!(items[0].assignee_name.is_none());
    }

    #[test]
    fn test_invalid_value_is_not_converted() {
        assert!(decode_qa_answer(json!({"answer": "x", "evidence": ""})).is_err());
        assert!(decode_summary(json!(" ")).is_err());
        assert!(decode_summary(json!(["- a"])).is_err());
    }

    #[test]
    fn test_action_item_serializes_nulls() {
        let item = ActionItem {
            task_content: "t".into(),
            assignee_name: None,
            due_at: None,
            note: None,
            evidence: "e".into(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["note"], Value::Null);
        assert_eq!(decode_action_items(json!([value])).unwrap(), vec![item]);
    }
}
