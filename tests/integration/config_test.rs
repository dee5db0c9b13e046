//! Configuration Integration Tests
//!
//! ConfigService round-trips through a temporary directory and the resulting
//! settings drive a real client.

use std::sync::Arc;

use chalkline::{AppError, ConfigService, LessonClient, SettingsUpdate};
use chalkline_llm::ReplayProvider;

use crate::support::RecordingSynth;

#[test]
fn test_defaults_written_as_camel_case_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    ConfigService::from_path(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["narration"]["maxCallsPerMinute"], 10);
    assert_eq!(raw["narration"]["windowSecs"], 60);
    assert_eq!(raw["generation"]["sequenceKey"], "whiteboard");
    assert_eq!(raw["generation"]["narrationKey"], "explanation");
    assert!(raw.get("provider").is_none());
    assert!(!raw.to_string().contains("apiKey"));
}

#[test]
fn test_corrupt_file_is_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = ConfigService::from_path(&path).unwrap_err();
    assert!(matches!(err, AppError::Serialization(_)));
}

#[tokio::test(start_paused = true)]
async fn test_updated_quota_reaches_client() {
    let dir = tempfile::tempdir().unwrap();
    let mut service = ConfigService::from_path(dir.path().join("config.json")).unwrap();
    service
        .update_config(SettingsUpdate {
            max_calls_per_minute: Some(2),
            max_queue_len: Some(Some(5)),
            ..Default::default()
        })
        .unwrap();

    let client = LessonClient::new(
        service.get_config(),
        Arc::new(ReplayProvider::from_text_chunks(["{}"])),
        RecordingSynth::new(),
    )
    .unwrap();

    let limiter = client.limiter().config();
    assert_eq!(limiter.max_calls_per_minute, 2);
    assert_eq!(limiter.max_queue_len, Some(5));
    assert_eq!(client.limiter().remaining_calls(), 2);
}
