/*!
 * 自然语言解析集成测试：两阶段解析、模型回复处理与回退
 */

mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use command_bridge::resolver::ConversionOrigin;
use test_utils::{MockModel, TestEnvironment};

#[tokio::test]
async fn test_alternatives_are_monotonic() {
    let reply = r#"{
        "command": "cat",
        "args": ["readme.md"],
        "confidence": 0.6,
        "alternatives": [
            {"command": "info", "args": ["readme.md"], "confidence": 0.9},
            {"command": "teleport", "confidence": 0.5},
            {"command": "@pocket:grep", "args": ["readme"], "confidence": 0.2},
            {"command": "cat", "confidence": 0.4}
        ]
    }"#;
    let env = TestEnvironment::with_model(Arc::new(MockModel::replying(reply)));

    let conversion = env
        .components
        .resolver
        .convert("pocket", "readme.md 를 보고 싶어")
        .await;

    assert_eq!(conversion.command, "cat");
    assert_eq!(conversion.origin, ConversionOrigin::Model);
    let commands: Vec<&str> = conversion
        .alternatives
        .iter()
        .map(|a| a.command.as_str())
        .collect();
    assert_eq!(commands, vec!["info", "grep"]);
    assert_eq!(conversion.alternatives[0].confidence, 0.6);
    assert!(conversion
        .alternatives
        .windows(2)
        .all(|w| w[0].confidence >= w[1].confidence));
    assert!(conversion
        .alternatives
        .iter()
        .all(|a| a.confidence <= conversion.confidence));
}

#[tokio::test]
async fn test_keyword_match_keeps_dampened_alternative() {
    let reply = r#"{"command": "info", "args": ["docs/"], "confidence": 0.9}"#;
    let env = TestEnvironment::with_model(Arc::new(MockModel::replying(reply)));

    let conversion = env
        .components
        .resolver
        .convert("pocket", "docs 폴더의 파일 목록 보여줘")
        .await;

    assert_eq!(conversion.command, "info");
    assert_eq!(conversion.alternatives.len(), 1);
    let alt = &conversion.alternatives[0];
    assert_eq!(alt.command, "ls");
    assert_eq!(alt.args, vec!["docs/"]);
    assert!((alt.confidence - 5.0 / 18.0 * 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn test_strong_keyword_match_skips_model() {
    let model = Arc::new(MockModel::replying(r#"{"command": "rm"}"#));
    let env = TestEnvironment::with_model(model.clone());

    let conversion = env.components.resolver.convert("pocket", "list files").await;

    assert_eq!(conversion.command, "ls");
    assert_eq!(conversion.origin, ConversionOrigin::Heuristic);
    assert!((conversion.confidence - 0.8).abs() < 1e-9);
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_model_error_uses_keyword_result() {
    let env = TestEnvironment::with_model(Arc::new(MockModel::failing("503 overloaded")));

    let conversion = env
        .components
        .resolver
        .convert("git", "최근 5개 커밋 기록 보여줘")
        .await;

    assert_eq!(conversion.command, "log");
    assert_eq!(conversion.args, vec!["--max-count=5"]);
    assert_eq!(conversion.origin, ConversionOrigin::Heuristic);
    assert!(!conversion.ambiguous);
    assert!(conversion.explanation.contains("503 overloaded"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_model_times_out() {
    let model = MockModel::replying(r#"{"command": "rm", "confidence": 1.0}"#)
        .with_delay(Duration::from_secs(120));
    let env = TestEnvironment::with_model(Arc::new(model));

    let conversion = env.components.resolver.convert("pocket", "흠").await;

    assert_eq!(conversion.command, "ls");
    assert!(conversion.ambiguous);
    assert_eq!(conversion.confidence, 0.3);
    assert!(conversion.explanation.contains("timed out"));
}

#[tokio::test]
async fn test_unknown_domain() {
    let env = TestEnvironment::new();
    let conversion = env.components.resolver.convert("weather", "내일 날씨").await;

    assert!(conversion.command.is_empty());
    assert_eq!(conversion.confidence, 0.0);
    assert!(conversion.to_command("weather").is_none());
    assert_eq!(conversion.interpreted_as("weather"), "No interpretation in @weather");
}

#[test]
fn test_conversion_outside_async_runtime() {
    let env = TestEnvironment::new();
    let conversion =
        tokio_test::block_on(env.components.resolver.convert("system", "show me the version"));
    assert_eq!(conversion.command, "version");
    assert_eq!(
        conversion.to_command("system").unwrap().to_command_line(),
        "/version"
    );
}
