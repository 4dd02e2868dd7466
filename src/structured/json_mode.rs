//! Extraction of JSON payloads from model text.
//!
//! Models asked for JSON frequently wrap it in markdown code fences. The fences are removed
//! before parsing; anything else around the payload is left in place and makes parsing fail.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```json\s*").expect("valid regex"));
static BARE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*").expect("valid regex"));

/// Remove every ```` ```json ```` and ```` ``` ```` marker and trim the result.
pub fn strip_code_fences(text: &str) -> String {
    let without_json = JSON_FENCE.replace_all(text, "");
    BARE_FENCE.replace_all(&without_json, "").trim().to_string()
}

/// Strip code fences and parse what remains as JSON.
pub fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&strip_code_fences(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json_is_untouched() {
        assert_eq!(strip_code_fences("  [1, 2]\n"), "[1, 2]");
        assert_eq!(parse_json("{\"a\": 1}").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_json_fence_removed() {
        let text = "```json\n[{\"task_content\": \"x\"}]\n```";
        assert_eq!(parse_json(text).unwrap(), json!([{"task_content": "x"}]));
    }

    #[test]
    fn test_bare_fence_removed() {
        let text = "```\n{\"answer\": \"A\", \"evidence\": \"B\"}\n```\n";
        assert_eq!(
            parse_json(text).unwrap(),
            json!({"answer": "A", "evidence": "B"})
        );
    }

    #[test]
    fn test_surrounding_prose_fails() {
        assert!(parse_json("Here you go: ```json\n[]\n```").is_err());
        assert!(parse_json("not json at all").is_err());
    }
}
