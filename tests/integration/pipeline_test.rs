//! Generation Pipeline Integration Tests
//!
//! Prompt -> streamed plan -> early narration -> recovered plan, using paced
//! and replayed providers with a recording synthesizer. Time is paused so
//! narration spacing can be asserted exactly.

use std::sync::Arc;
use std::time::Duration;

use chalkline::{AppConfig, AppError, LessonClient, NarrationError};
use chalkline_llm::{LlmError, ReplayProvider};

use crate::support::{init_tracing, PacedProvider, RecordingSynth, LEVER_CHUNKS};

async fn ready_client(
    config: &AppConfig,
    provider: Arc<dyn chalkline_llm::LlmProvider>,
    synth: Arc<RecordingSynth>,
) -> LessonClient {
    let client = LessonClient::new(config, provider, synth).unwrap();
    client.init().await.unwrap();
    client
}

#[tokio::test(start_paused = true)]
async fn test_early_narration_starts_before_stream_ends() {
    init_tracing();
    let provider = PacedProvider::new(&LEVER_CHUNKS, Duration::from_secs(1));
    let synth = RecordingSynth::new();
    let client = ready_client(&AppConfig::default(), provider.clone(), synth.clone()).await;

    let lesson = client.generate("Explain how a lever works").await.unwrap();

    assert!(lesson.narration_detected_early);
    assert_eq!(lesson.plan.whiteboard.len(), 3);
    assert_eq!(lesson.usage.output_tokens, 340);

    let early = lesson.early_narration.as_ref().expect("early narration dispatched");
    assert_eq!(early.text(), "This is the \"pivot\".");

    let finished_at = (*provider.finished_at.lock().unwrap()).expect("stream finished");
    let first_call = synth.start_times()[0];
    assert!(first_call < finished_at, "synthesis must start while streaming");
    assert_eq!(synth.spoken(), vec!["This is the \"pivot\"."]);
}

#[tokio::test(start_paused = true)]
async fn test_remaining_steps_narrated_in_order_with_spacing() {
    init_tracing();
    let provider = PacedProvider::new(&LEVER_CHUNKS, Duration::from_millis(200));
    let synth = RecordingSynth::new();
    let client = ready_client(&AppConfig::default(), provider, synth.clone()).await;

    let mut lesson = client.generate("Explain how a lever works").await.unwrap();
    let rest = client.narrate_remaining(&lesson);
    let indices: Vec<_> = rest.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![1, 2]);

    lesson.early_narration.take().unwrap().wait().await.unwrap();
    for (_, handle) in rest {
        handle.wait().await.unwrap();
    }

    assert_eq!(
        synth.spoken(),
        vec!["This is the \"pivot\".", "Push down here.", "The load rises."]
    );
    let starts = synth.start_times();
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(6000));
    }
    assert_eq!(client.limiter().remaining_calls(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_detection_miss_is_not_an_error() {
    init_tracing();
    let mut config = AppConfig::default();
    config.generation.sequence_key = "steps".to_string();

    let provider = PacedProvider::new(&LEVER_CHUNKS, Duration::from_millis(10));
    let synth = RecordingSynth::new();
    let client = ready_client(&config, provider, synth.clone()).await;

    let lesson = client.generate("Explain how a lever works").await.unwrap();
    assert!(!lesson.narration_detected_early);
    assert!(lesson.early_narration.is_none());
    assert!(synth.spoken().is_empty());

    let all = client.narrate_remaining(&lesson);
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].0, 0);
}

#[tokio::test(start_paused = true)]
async fn test_quota_exhaustion_surfaces_user_message() {
    init_tracing();
    let provider = Arc::new(ReplayProvider::from_text_chunks(LEVER_CHUNKS));
    let client = ready_client(&AppConfig::default(), provider, RecordingSynth::exhausted()).await;

    let lesson = client.generate("Explain how a lever works").await.unwrap();
    assert_eq!(lesson.plan.whiteboard.len(), 3);

    let err = lesson.early_narration.unwrap().wait().await.unwrap_err();
    assert!(matches!(err, NarrationError::QuotaExceeded { .. }));

    let app_err = AppError::from(err);
    assert!(app_err.is_transient());
    assert_eq!(
        app_err.user_message(),
        "Speech quota exhausted. Please try again later."
    );
}

#[tokio::test(start_paused = true)]
async fn test_reasoning_and_fenced_output() {
    init_tracing();
    let mut chunks = vec![
        "<think>The user wants levers. ",
        "I'll use three steps {maybe}.</think>",
        "Here is your lesson:\n```json\n",
    ];
    chunks.extend(LEVER_CHUNKS);
    chunks.push("\n```\nLet me know if you want more {detail}!");

    let provider = Arc::new(ReplayProvider::from_text_chunks(chunks));
    let synth = RecordingSynth::new();
    let client = ready_client(&AppConfig::default(), provider, synth).await;

    let lesson = client.generate("levers").await.unwrap();
    assert!(lesson.narration_detected_early);
    assert_eq!(lesson.plan.explanation, "How a lever works");
    assert_eq!(lesson.plan.narration(2), Some("The load rises."));
}

#[tokio::test(start_paused = true)]
async fn test_upstream_rate_limit_propagates() {
    init_tracing();
    let provider = Arc::new(
        ReplayProvider::from_text_chunks(&LEVER_CHUNKS[..3]).with_failure(LlmError::RateLimited {
            message: "429 Too Many Requests".to_string(),
            retry_after: Some(20),
        }),
    );
    let client = ready_client(&AppConfig::default(), provider, RecordingSynth::new()).await;

    let err = client.generate("levers").await.unwrap_err();
    assert!(err.is_transient());
    assert!(matches!(err, AppError::Llm(LlmError::RateLimited { .. })));
    assert!(err.user_message().contains("20 seconds"));
}

#[tokio::test(start_paused = true)]
async fn test_truncated_plan_fails_recovery() {
    init_tracing();
    let provider = Arc::new(ReplayProvider::from_text_chunks(&LEVER_CHUNKS[..4]));
    let synth = RecordingSynth::new();
    let client = ready_client(&AppConfig::default(), provider, synth.clone()).await;

    let err = client.generate("levers").await.unwrap_err();
    assert!(matches!(err, AppError::Plan(_)));
    // Narration for step 0 was already under way.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(synth.spoken().len(), 1);
}
