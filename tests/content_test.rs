//! Content collaborators: retry policy and caller-side timeouts.

mod common;

use std::sync::Arc;
use std::time::Duration;
use coachsm::{
    ContentError, ContentGenerator, ContentKind, ContentRequest, EngineBuilder, EngineConfig,
    MockContentGenerator, Mode, RetryingGenerator, StateId,
};
use common::harness_with;

fn request() -> ContentRequest {
    ContentRequest::new(ContentKind::Lesson, "Time planning", 1)
}

fn unavailable(msg: &str) -> Result<String, ContentError> {
    Err(ContentError::Unavailable(msg.to_string()))
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_from_transient_errors() {
    let inner = Arc::new(MockContentGenerator::new(vec![
        unavailable("503 service unavailable"),
        unavailable("connection reset"),
        Ok("a lesson".to_string()),
    ]));
    let generator = RetryingGenerator::new(inner.clone(), 3);

    let result = generator.generate(&request()).await;

    assert_eq!(result, Ok("a lesson".to_string()));
    assert_eq!(inner.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_gives_up_after_max_retries() {
    let inner = Arc::new(MockContentGenerator::new(vec![
        unavailable("timeout"),
        unavailable("timeout"),
        unavailable("timeout"),
    ]));
    let generator = RetryingGenerator::new(inner.clone(), 2);

    let err = generator.generate(&request()).await.unwrap_err();

    assert_eq!(err, ContentError::Exhausted {
        retries: 2,
        last:    Box::new(ContentError::Unavailable("timeout".to_string())),
    });
    assert!(err.to_string().starts_with("content generation failed after 2 retries"), "{}", err);
    assert_eq!(inner.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_longer_between_attempts() {
    let inner = Arc::new(MockContentGenerator::new(vec![
        Err(ContentError::RateLimited("slow down".to_string())),
        Ok("a lesson".to_string()),
    ]));
    let generator = RetryingGenerator::new(inner.clone(), 1);
    let started = tokio::time::Instant::now();

    let result = generator.generate(&request()).await;

    assert_eq!(result, Ok("a lesson".to_string()));
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_exhaustion_keeps_last_error() {
    let inner = Arc::new(MockContentGenerator::new(vec![
        Err(ContentError::RateLimited("slow down".to_string())),
        Err(ContentError::RateLimited("slow down".to_string())),
    ]));
    let generator = RetryingGenerator::new(inner, 1);

    let err = generator.generate(&request()).await.unwrap_err();

    match err {
        ContentError::Exhausted { last, .. } => assert!(matches!(*last, ContentError::RateLimited(_))),
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_request_is_not_retried() {
    let inner = Arc::new(MockContentGenerator::new(vec![
        Err(ContentError::Rejected("invalid api key".to_string())),
        Ok("never reached".to_string()),
    ]));
    let generator = RetryingGenerator::new(inner.clone(), 3);

    let err = generator.generate(&request()).await.unwrap_err();

    assert_eq!(err, ContentError::Rejected("invalid api key".to_string()));
    assert!(!err.is_retryable());
    assert_eq!(inner.call_count(), 1);
}

#[tokio::test]
async fn test_mock_records_requests() {
    let mock = MockContentGenerator::canned();

    let text = mock.generate(&request()).await.unwrap();

    assert_eq!(text, "[lesson] Time planning");
    assert_eq!(mock.request(0), Some(request()));
    assert_eq!(mock.request(1), None);
}

#[tokio::test(start_paused = true)]
async fn test_slow_generation_times_out_into_fallback() {
    let config = EngineConfig {
        collaborator_timeout_ms: 50,
        ..EngineConfig::default()
    };
    let h = harness_with(
        EngineBuilder::new().config(config),
        MockContentGenerator::canned().with_delay(Duration::from_secs(5)),
    );

    let cycle = h.engine.start(1, Some(Mode::Marathon)).await.unwrap();

    assert!(cycle.fault.is_none());
    assert_eq!(cycle.state_id(), &StateId::marathon_lesson());
    assert!(cycle.trace.events().contains(&"LESSON_FAILED"));
    let entries = cycle.trace.for_state("workshop.marathon.lesson");
    let failure = &entries[0].detail;
    assert!(failure.contains("timed out"), "{}", failure);
    assert!(cycle.session.context.get("lesson_text").is_none());
    assert!(h.transport.texts_for(1)[0].contains("unavailable"));
}

#[tokio::test]
async fn test_digest_failure_keeps_counter() {
    let h = harness_with(
        EngineBuilder::new(),
        MockContentGenerator::new(vec![unavailable("upstream 500")]),
    );
    let started = h.engine.start(2, Some(Mode::Feed)).await.unwrap();

    let cycle = h.engine.step(started.session, &coachsm::Inbound::Text("Writing".into())).await.unwrap();

    assert_eq!(cycle.state_id(), &StateId::feed_digest());
    assert_eq!(cycle.session.context.get_u64("digests_read"), None);
    assert!(h.transport.texts_for(2).last().unwrap().contains("digest is unavailable"));
}
