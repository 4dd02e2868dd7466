//! End-to-end behavior of the guard: ordering of checks, counters, debounce and caching.

mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{config, guard_with, morning_clock, ScriptedProvider, SharedCache};
use minutes_ai::actions::{AnswerQuestion, ExtractActions, Summarize};
use minutes_ai::cache::{CacheBackend, CacheKeyGenerator, MemoryCache};
use minutes_ai::guard::{GuardError, InputField, GENERIC_FAILURE_MESSAGE};
use minutes_ai::identity::{IdentityResolver, MemoryCookieJar};
use minutes_ai::{AiGuard, IdentityKey, MinutesAssistant};

const ACTIONS_REPLY: &str = r#"```json
[
  {"task_content": "見積もりを送付する", "assignee_name": "田中", "due_at": "2025-12-26", "note": null, "evidence": "田中さんが来週までに見積もりを送る"},
  {"task_content": "議事録を共有する", "assignee_name": null, "due_at": null, "note": null, "evidence": "議事録は全員に共有すること"}
]
```"#;

#[tokio::test]
async fn test_oversized_text_never_reaches_provider() {
    let provider = ScriptedProvider::replying("- ok");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));

    let text = "あ".repeat(30_001);
    let err = guard
        .invoke(&IdentityKey::guest("g1"), &Summarize::new(text))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GuardError::InputTooLarge { field: InputField::RawText, limit: 30_000 }
    ));
    assert!(err.user_message().contains("30,000"));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_exactly_at_ceiling_is_accepted() {
    let provider = ScriptedProvider::replying("- ok");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));

    let text = "議".repeat(30_000);
    assert!(guard.invoke(&IdentityKey::guest("g1"), &Summarize::new(text)).await.is_ok());
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_size_is_checked_before_emptiness() {
    let provider = ScriptedProvider::replying("{}");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));

    let err = guard
        .invoke(
            &IdentityKey::guest("g1"),
            &AnswerQuestion::new("   ", "q".repeat(801)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::InputTooLarge { field: InputField::Question, .. }));
    assert_eq!(err.user_message(), "質問は800文字以下にしてください");
}

#[tokio::test]
async fn test_oversized_minutes_of_a_question() {
    let provider = ScriptedProvider::replying("{}");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));
    let who = IdentityKey::guest("g1");

    let err = guard
        .invoke(&who, &AnswerQuestion::new("あ".repeat(30_001), "予算は?"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GuardError::InputTooLarge { field: InputField::QuestionContext, limit: 30_000 }
    ));
    assert_eq!(err.user_message(), "議事録は30,000文字以下にしてください");

    let err = guard
        .invoke(&who, &AnswerQuestion::new(" ", "予算は?"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "議事録テキストを入力してください");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_empty_inputs_have_messages() {
    let provider = ScriptedProvider::replying("- ok");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));
    let who = IdentityKey::guest("g1");

    let err = guard.invoke(&who, &Summarize::new(" \n\t")).await.unwrap_err();
    assert!(!err.user_message().is_empty());
    assert_eq!(err.user_message(), "議事録テキストを入力してください");

    let err = guard
        .invoke(&who, &AnswerQuestion::new("minutes", "  "))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "質問を入力してください");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_daily_limit_and_rollover() {
    let provider = ScriptedProvider::replying("- ok");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(2, 0));
    let who = IdentityKey::user("u1");

    guard.invoke(&who, &Summarize::new("first")).await.unwrap();
    guard.invoke(&who, &Summarize::new("second")).await.unwrap();
    assert_eq!(guard.remaining_today(&who).await.unwrap(), 0);

    let err = guard.invoke(&who, &Summarize::new("third")).await.unwrap_err();
    assert!(matches!(err, GuardError::RateLimitExceeded { limit: 2 }));
    assert!(err.user_message().contains("1日2回"));
    assert_eq!(provider.calls(), 2);

    // other identities are unaffected
    assert!(guard
        .invoke(&IdentityKey::guest("g2"), &Summarize::new("third"))
        .await
        .is_ok());

    clock.advance(Duration::days(1));
    assert_eq!(guard.remaining_today(&who).await.unwrap(), 2);
    assert!(guard.invoke(&who, &Summarize::new("fourth")).await.is_ok());
}

#[tokio::test]
async fn test_zero_limit_rejects_everything() {
    let provider = ScriptedProvider::replying("- ok");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(0, 30));

    let err = guard
        .invoke(&IdentityKey::guest("g1"), &Summarize::new("text"))
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::RateLimitExceeded { limit: 0 }));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_exhausted_limit_refuses_cache_hits() {
    let provider = ScriptedProvider::replying("- ok");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(1, 0));
    let who = IdentityKey::guest("g1");
    let action = Summarize::new("参加者: A, B");

    assert_eq!(guard.invoke(&who, &action).await.unwrap(), "- ok");

    // the entry is cached, but the rate check runs first
    let err = guard.invoke(&who, &action).await.unwrap_err();
    assert!(matches!(err, GuardError::RateLimitExceeded { limit: 1 }));

    let other = IdentityKey::guest("g2");
    assert_eq!(guard.invoke(&other, &action).await.unwrap(), "- ok");
    assert_eq!(guard.remaining_today(&other).await.unwrap(), 1);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_debounce_spacing() {
    let provider = ScriptedProvider::replying("- ok");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));
    let who = IdentityKey::guest("g1");

    guard.invoke(&who, &Summarize::new("one")).await.unwrap();

    clock.advance(Duration::seconds(10));
    let err = guard.invoke(&who, &Summarize::new("two")).await.unwrap_err();
    assert!(matches!(err, GuardError::TooFrequent { retry_after_secs: 20 }));
    assert_eq!(
        err.user_message(),
        "短時間での連続実行は制限されています。20秒後に再度お試しください"
    );

    clock.advance(Duration::milliseconds(19_500));
    let err = guard.invoke(&who, &Summarize::new("two")).await.unwrap_err();
    assert!(matches!(err, GuardError::TooFrequent { retry_after_secs: 1 }));

    clock.advance(Duration::milliseconds(500));
    assert!(guard.invoke(&who, &Summarize::new("two")).await.is_ok());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_cache_hit_is_free() {
    let provider = ScriptedProvider::replying("- 決定事項: 金曜リリース");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));
    let who = IdentityKey::guest("g1");

    let first = guard.invoke(&who, &Summarize::new("金曜にリリースする")).await.unwrap();
    clock.advance(Duration::minutes(5));
    let second = guard.invoke(&who, &Summarize::new("金曜にリリースする")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.calls(), 1);
    assert_eq!(guard.remaining_today(&who).await.unwrap(), 9);
    assert_eq!(guard.cache_stats().hits, 1);
}

#[tokio::test]
async fn test_cache_hit_bypasses_debounce() {
    let provider = ScriptedProvider::replying("- summary");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));
    let who = IdentityKey::guest("g1");

    guard.invoke(&who, &Summarize::new("text")).await.unwrap();
    // same instant: a miss would be debounced, a hit is not
    assert!(guard.invoke(&who, &Summarize::new("text")).await.is_ok());
    assert!(matches!(
        guard.invoke(&who, &Summarize::new("other")).await,
        Err(GuardError::TooFrequent { .. })
    ));
}

#[tokio::test]
async fn test_cache_is_shared_across_identities() {
    let provider = ScriptedProvider::replying("- summary");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));

    guard.invoke(&IdentityKey::guest("a"), &Summarize::new("text")).await.unwrap();
    guard.invoke(&IdentityKey::user("b"), &Summarize::new("text")).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(guard.remaining_today(&IdentityKey::user("b")).await.unwrap(), 10);
}

#[tokio::test]
async fn test_expired_entry_calls_provider_again() {
    let provider = ScriptedProvider::script(vec![Ok("- old".into()), Ok("- new".into())]);
    let clock = morning_clock();
    let guard = guard_with(
        provider.clone(),
        &clock,
        config(10, 30).with_cache_ttl(std::time::Duration::from_secs(60)),
    );
    let who = IdentityKey::guest("g1");

    assert_eq!(guard.invoke(&who, &Summarize::new("text")).await.unwrap(), "- old");
    clock.advance(Duration::seconds(61));
    assert_eq!(guard.invoke(&who, &Summarize::new("text")).await.unwrap(), "- new");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_extract_actions_round_trip() {
    let provider = ScriptedProvider::replying(ACTIONS_REPLY);
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));
    let who = IdentityKey::guest("g1");
    let action = ExtractActions::new("田中さんが来週までに見積もりを送る。議事録は全員に共有すること。");

    let live = guard.invoke(&who, &action).await.unwrap();
    let cached = guard.invoke(&who, &action).await.unwrap();

    assert_eq!(live, cached);
    assert_eq!(live.len(), 2);
    assert_eq!(live[0].assignee_name.as_deref(), Some("田中"));
    assert_eq!(live[1].due_at, None);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_empty_evidence_is_rejected() {
    let reply = r#"[{"task_content": "送付", "assignee_name": null, "due_at": null, "note": null, "evidence": "  "}]"#;
    let provider = ScriptedProvider::replying(reply);
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));
    let who = IdentityKey::guest("g1");

    let err = guard.invoke(&who, &ExtractActions::new("text")).await.unwrap_err();
    assert!(matches!(err, GuardError::InvalidResponse { .. }));
    assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);

    // nothing was committed
    assert_eq!(guard.remaining_today(&who).await.unwrap(), 10);
    assert_eq!(guard.cache_stats().sets, 0);
}

#[tokio::test]
async fn test_unparseable_reply_is_malformed() {
    let provider = ScriptedProvider::replying("Sorry, I cannot help with that.");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));

    let err = guard
        .invoke(&IdentityKey::guest("g1"), &ExtractActions::new("text"))
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::MalformedResponse { .. }));
    assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn test_provider_failure_consumes_nothing() {
    let provider = ScriptedProvider::failing("upstream 503");
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));
    let who = IdentityKey::guest("g1");

    let err = guard.invoke(&who, &Summarize::new("text")).await.unwrap_err();
    assert!(matches!(err, GuardError::Provider(_)));
    assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    assert!(!err.user_message().contains("503"));
    assert_eq!(guard.remaining_today(&who).await.unwrap(), 10);

    // a failed call does not start the debounce window
    assert!(matches!(
        guard.invoke(&who, &Summarize::new("text")).await,
        Err(GuardError::Provider(_))
    ));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_corrupt_entry_is_evicted_and_refetched() {
    let provider = ScriptedProvider::replying("- fresh");
    let clock = morning_clock();
    let cache = Arc::new(MemoryCache::with_clock(Arc::new(clock.clone())));
    let guard = AiGuard::builder(provider.clone())
        .with_config(config(10, 30))
        .with_clock(Arc::new(clock.clone()))
        .with_cache_backend(Box::new(SharedCache(cache.clone())))
        .build();

    let key = CacheKeyGenerator::new().generate("summary", &["text"]);
    cache
        .set(&key, "\"   \"", std::time::Duration::from_secs(3600))
        .await
        .unwrap();

    let who = IdentityKey::guest("g1");
    assert_eq!(guard.invoke(&who, &Summarize::new("text")).await.unwrap(), "- fresh");
    assert_eq!(provider.calls(), 1);
    assert_eq!(guard.cache_stats().errors, 1);
    assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("\"- fresh\""));
}

#[tokio::test]
async fn test_concurrent_identical_misses_all_succeed() {
    let provider = ScriptedProvider::replying("- same");
    let clock = morning_clock();
    let guard = Arc::new(guard_with(provider.clone(), &clock, config(10, 30)));

    let calls = (0..8).map(|i| {
        let guard = guard.clone();
        async move {
            guard
                .invoke(&IdentityKey::guest(format!("g{i}")), &Summarize::new("text"))
                .await
        }
    });
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| matches!(r, Ok(s) if s == "- same")));
    assert!((1..=8).contains(&provider.calls()));
}

#[tokio::test]
async fn test_qa_scenario_through_assistant() {
    let reply = r#"{"answer": "記載がありません", "evidence": "予算についての言及はない"}"#;
    let provider = ScriptedProvider::replying(reply);
    let clock = morning_clock();
    let guard = guard_with(provider.clone(), &clock, config(10, 30));
    let assistant = MinutesAssistant::new(Arc::new(guard), IdentityResolver::default());

    let jar = MemoryCookieJar::new();
    let who = assistant.identify(&jar, None);
    assert!(who.is_guest());
    assert_eq!(jar.set_cookies().len(), 1);

    let minutes = "参加者: A, B\n決定事項: 金曜リリース";
    let first = assistant.answer_question(&who, minutes, "予算は?").await;
    let second = assistant.answer_question(&who, minutes, "予算は?").await;

    assert!(first.is_success());
    assert_eq!(first, second);
    assert_eq!(first.payload().unwrap().result.answer, "記載がありません");
    assert_eq!(provider.calls(), 1);

    let json = serde_json::to_value(&first).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["result"]["evidence"], "予算についての言及はない");
}

#[tokio::test]
async fn test_assistant_failure_shape() {
    let provider = ScriptedProvider::replying("- ok");
    let clock = morning_clock();
    let guard = guard_with(provider, &clock, config(10, 30));
    let assistant = MinutesAssistant::new(Arc::new(guard), IdentityResolver::default());

    let resp = assistant.summarize(&IdentityKey::guest("g"), "").await;
    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "議事録テキストを入力してください");
    assert!(json.get("summary").is_none());
}
