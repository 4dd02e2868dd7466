//! Shape validators for provider responses.
//!
//! Each action has a predicate (`is_*`) used on the hot path and a diagnostic form
//! (`check_*`) that reports the first failing location for logs. Both accept the same set of
//! candidates. Only JSON values that pass a predicate are turned into typed payloads.

use crate::structured::error::{ValidationError, ValidationResult};
use serde_json::{Map, Value};

/// Keys every extracted action item must carry, nullable or not.
pub const ACTION_ITEM_KEYS: [&str; 5] = ["task_content", "assignee_name", "due_at", "note", "evidence"];
const ACTION_ITEM_REQUIRED: [&str; 2] = ["evidence", "task_content"];
const ACTION_ITEM_NULLABLE: [&str; 3] = ["assignee_name", "due_at", "note"];
const QA_REQUIRED: [&str; 2] = ["answer", "evidence"];

/// A summary is any text that is not blank.
pub fn is_summary(candidate: &str) -> bool {
    check_summary(candidate).is_ok()
}

pub fn check_summary(candidate: &str) -> ValidationResult {
    if candidate.trim().is_empty() {
        return Err(ValidationError::without_path("summary must not be empty"));
    }
    Ok(())
}

/// An array of action items. The empty array is valid.
pub fn is_action_items(candidate: &Value) -> bool {
    check_action_items(candidate).is_ok()
}

pub fn check_action_items(candidate: &Value) -> ValidationResult {
    let items = candidate
        .as_array()
        .ok_or_else(|| ValidationError::without_path(format!("expected an array, got {}", type_name(candidate))))?;

    for (index, item) in items.iter().enumerate() {
        let prefix = format!("[{}]", index);
        let object = item
            .as_object()
            .ok_or_else(|| ValidationError::with_path(format!("expected an object, got {}", type_name(item)), prefix.clone()))?;

        for key in ACTION_ITEM_KEYS {
            if !object.contains_key(key) {
                return Err(ValidationError::with_path("missing key", format!("{}.{}", prefix, key)));
            }
        }
        for key in ACTION_ITEM_REQUIRED {
            require_text(object, key, &prefix)?;
        }
        for key in ACTION_ITEM_NULLABLE {
            match object.get(key) {
                Some(Value::Null) | Some(Value::String(_)) | None => {}
                Some(other) => {
                    return Err(ValidationError::with_path(
                        format!("expected string or null, got {}", type_name(other)),
                        format!("{}.{}", prefix, key),
                    ))
                }
            }
        }
    }
    Ok(())
}

/// An answer object with non-empty `answer` and `evidence`.
pub fn is_qa_answer(candidate: &Value) -> bool {
    check_qa_answer(candidate).is_ok()
}

pub fn check_qa_answer(candidate: &Value) -> ValidationResult {
    let object = candidate
        .as_object()
        .ok_or_else(|| ValidationError::without_path(format!("expected an object, got {}", type_name(candidate))))?;
    for key in QA_REQUIRED {
        require_text(object, key, "")?;
    }
    Ok(())
}

fn require_text(object: &Map<String, Value>, key: &str, prefix: &str) -> ValidationResult {
    let path = if prefix.is_empty() { key.to_string() } else { format!("{}.{}", prefix, key) };
    match object.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) => Err(ValidationError::with_path("must not be empty", path)),
        Some(other) => Err(ValidationError::with_path(format!("expected string, got {}", type_name(other)), path)),
        None => Err(ValidationError::with_path("missing key", path)),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
