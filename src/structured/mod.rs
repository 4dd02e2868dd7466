//! Structured output module for minutes-ai.
//!
//! Turns raw provider text into validated, typed payloads:
//! - `strip_code_fences` / `parse_json`: remove markdown fences and parse JSON
//! - `is_action_items`, `is_qa_answer`, `is_summary`: shape predicates per action
//! - `check_*`: the same checks, reporting where a candidate failed
//! - `decode_*`: validated conversion into the typed result of each action
//!
//! # Examples
//!
//! ```
//! use minutes_ai::structured::{is_action_items, parse_json};
//!
//! let value = parse_json("```json\n[]\n```").unwrap();
//! assert!(is_action_items(&value));
//! ```

pub mod error;
pub mod json_mode;
pub mod schema;
pub mod validator;

pub use error::{ValidationError, ValidationResult};
pub use json_mode::{parse_json, strip_code_fences};
pub use schema::{decode_action_items, decode_qa_answer, decode_summary, ActionItem, QaAnswer};
pub use validator::{
    check_action_items, check_qa_answer, check_summary, is_action_items, is_qa_answer,
    is_summary, ACTION_ITEM_KEYS,
};
