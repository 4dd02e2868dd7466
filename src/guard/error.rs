//! Outcome taxonomy of a guarded AI invocation.

use std::fmt;

use thiserror::Error;

use crate::error::Error;

/// User-facing text shared by every provider or data-quality failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "エラーが発生しました。しばらく経ってから再度お試しください";

/// Input field checked by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    /// Meeting text the action runs over.
    RawText,
    /// Meeting text a question is answered from. Same limit as [`InputField::RawText`].
    QuestionContext,
    Question,
}

impl InputField {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputField::RawText | InputField::QuestionContext => "raw_text",
            InputField::Question => "question",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a guarded invocation did not produce a payload.
///
/// The first four variants are precondition failures with a specific message for the user.
/// Everything after them is reported with [`GENERIC_FAILURE_MESSAGE`]; the detail carried by
/// the variant is for logs only.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("{field} is empty")]
    EmptyInput { field: InputField },

    #[error("{field} exceeds {limit} characters")]
    InputTooLarge { field: InputField, limit: usize },

    #[error("daily limit of {limit} invocations reached")]
    RateLimitExceeded { limit: u32 },

    #[error("called again too soon, retry in {retry_after_secs}s")]
    TooFrequent { retry_after_secs: u64 },

    #[error("provider call failed: {0}")]
    Provider(#[source] Error),

    #[error("malformed provider response: {detail}")]
    MalformedResponse { detail: String },

    #[error("provider response failed validation: {detail}")]
    InvalidResponse { detail: String },

    /// A cache, rate-limit or debounce backend failed.
    #[error("guard store failed: {0}")]
    Store(#[source] Error),
}

impl GuardError {
    /// Stable identifier for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GuardError::EmptyInput { .. } => "empty_input",
            GuardError::InputTooLarge { .. } => "input_too_large",
            GuardError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            GuardError::TooFrequent { .. } => "too_frequent",
            GuardError::Provider(_) => "provider_error",
            GuardError::MalformedResponse { .. } => "malformed_response",
            GuardError::InvalidResponse { .. } => "invalid_response",
            GuardError::Store(_) => "store_error",
        }
    }

    /// Whether the user can fix the failure (shorter input, waiting) rather than it being a
    /// provider or backend problem.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GuardError::EmptyInput { .. }
                | GuardError::InputTooLarge { .. }
                | GuardError::RateLimitExceeded { .. }
                | GuardError::TooFrequent { .. }
        )
    }

    /// Localized message safe to show to the end user.
    pub fn user_message(&self) -> String {
        match self {
            GuardError::EmptyInput { field: InputField::RawText | InputField::QuestionContext } => {
                "議事録テキストを入力してください".to_string()
            }
            GuardError::EmptyInput { field: InputField::Question } => {
                "質問を入力してください".to_string()
            }
            GuardError::InputTooLarge { field: InputField::RawText, limit } => {
                format!("入力は{}文字以下にしてください", group_thousands(*limit as u64))
            }
            GuardError::InputTooLarge { field: InputField::QuestionContext, limit } => {
                format!("議事録は{}文字以下にしてください", group_thousands(*limit as u64))
            }
            GuardError::InputTooLarge { field: InputField::Question, limit } => {
                format!("質問は{}文字以下にしてください", group_thousands(*limit as u64))
            }
            GuardError::RateLimitExceeded { limit } => format!(
                "利用回数の上限（1日{}回）に達しました。しばらく経ってから再度お試しください",
                group_thousands(*limit as u64)
            ),
            GuardError::TooFrequent { retry_after_secs } => format!(
                "短時間での連続実行は制限されています。{}秒後に再度お試しください",
                retry_after_secs
            ),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// `30000` -> `"30,000"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorContext;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(800), "800");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(30_000), "30,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_precondition_messages() {
        let too_large = GuardError::InputTooLarge {
            field: InputField::RawText,
            limit: 30_000,
        };
        assert!(too_large.user_message().contains("30,000"));
        assert!(too_large.is_precondition());

        let context_too_large = GuardError::InputTooLarge {
            field: InputField::QuestionContext,
            limit: 30_000,
        };
        assert_eq!(context_too_large.user_message(), "議事録は30,000文字以下にしてください");
        assert_eq!(InputField::QuestionContext.as_str(), "raw_text");

        let empty = GuardError::EmptyInput {
            field: InputField::Question,
        };
        assert!(!empty.user_message().is_empty());

        let limited = GuardError::RateLimitExceeded { limit: 10 };
        assert!(limited.user_message().contains("1日10回"));

        let frequent = GuardError::TooFrequent {
            retry_after_secs: 12,
        };
        assert!(frequent.user_message().contains("12秒後"));
    }

    #[test]
    fn test_failures_share_generic_message() {
        let provider = GuardError::Provider(Error::Remote {
            status: 401,
            class: "authentication".into(),
            message: "API key not valid".into(),
            retryable: false,
        });
        let malformed = GuardError::MalformedResponse {
            detail: "expected value at line 1 column 1".into(),
        };
        let invalid = GuardError::InvalidResponse {
            detail: "[0].evidence: must not be empty".into(),
        };
        let store = GuardError::Store(Error::storage_with_context("down", ErrorContext::new()));

        for err in [provider, malformed, invalid, store] {
            assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
            assert!(!err.is_precondition());
        }
    }

    #[test]
    fn test_detail_stays_in_display() {
        let err = GuardError::InvalidResponse {
            detail: "[0].evidence: must not be empty".into(),
        };
        assert!(err.to_string().contains("[0].evidence"));
        assert!(!err.user_message().contains("evidence"));
        assert_eq!(err.kind(), "invalid_response");
    }
}
