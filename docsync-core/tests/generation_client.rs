use docsync_core::contract::{GenerationRequest, MockTextGenerator, MockTextTransport, TextGenerator};
use docsync_core::generation::{complete_json, GenerationClient, RetryPolicy};
use docsync_core::SyncError;
use mockall::Sequence;
use serde::Deserialize;
use std::time::Duration;

fn request() -> GenerationRequest {
    GenerationRequest {
        system: "system".into(),
        user: "user".into(),
        model: "test-model".into(),
        max_tokens: 64,
    }
}

fn no_delay(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_retries_retryable_statuses_then_succeeds() {
    let mut transport = MockTextTransport::new();
    let mut seq = Sequence::new();
    transport
        .expect_send()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(SyncError::transport("anthropic", Some(429), "rate limited")));
    transport
        .expect_send()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(SyncError::transport("anthropic", Some(529), "overloaded")));
    transport
        .expect_send()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|req| Ok(format!("hello from {}", req.model)));

    let client = GenerationClient::new(transport).with_retry_policy(no_delay(3));
    let text = client.complete(request()).await.unwrap();
    assert_eq!(text, "hello from test-model");
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately() {
    let mut transport = MockTextTransport::new();
    transport
        .expect_send()
        .times(1)
        .returning(|_| Err(SyncError::transport("anthropic", Some(400), "bad request")));

    let client = GenerationClient::new(transport).with_retry_policy(no_delay(3));
    let err = client.complete(request()).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("bad request"));
}

#[tokio::test]
async fn test_gives_up_after_bounded_retries() {
    let mut transport = MockTextTransport::new();
    transport
        .expect_send()
        .times(3)
        .returning(|_| Err(SyncError::transport("anthropic", Some(503), "unavailable")));

    let client = GenerationClient::new(transport).with_retry_policy(no_delay(2));
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, SyncError::Transport { status: Some(503), .. }));
}

#[tokio::test]
async fn test_network_errors_are_retried() {
    let mut transport = MockTextTransport::new();
    let mut seq = Sequence::new();
    transport
        .expect_send()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(SyncError::transport("anthropic", None, "connection reset")));
    transport
        .expect_send()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("ok".into()));

    let client = GenerationClient::new(transport).with_retry_policy(no_delay(1));
    assert_eq!(client.complete(request()).await.unwrap(), "ok");
}

#[derive(Debug, Deserialize, PartialEq)]
struct Verdict {
    identical: bool,
    reason: String,
}

#[tokio::test]
async fn test_complete_json_parses_object_with_braces_in_strings() {
    let mut generator = MockTextGenerator::new();
    generator.expect_complete().returning(|_| {
        Ok("Here is my answer:\n{\"identical\": false, \"reason\": \"added {% hint %} block\"}\nThanks".into())
    });

    let verdict: Verdict = complete_json(&generator, request()).await.unwrap();
    assert_eq!(
        verdict,
        Verdict {
            identical: false,
            reason: "added {% hint %} block".into()
        }
    );
}

#[tokio::test]
async fn test_complete_json_without_object_is_parse_error() {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_complete()
        .returning(|_| Ok("I could not decide.".into()));

    let err = complete_json::<_, Verdict>(&generator, request()).await.unwrap_err();
    assert!(matches!(err, SyncError::Parse(_)));
}
