//! Test doubles shared by the integration tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use chalkline::{AudioClip, NarrationError, NarrationRequest, SpeechSynthesizer};
use chalkline_core::UnifiedStreamEvent;
use chalkline_llm::{
    LlmProvider, LlmResponse, LlmResult, Message, ProviderConfig, StopReason, UsageStats,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Plan used across tests, split the way a model might stream it.
pub const LEVER_CHUNKS: [&str; 6] = [
    r#"{"explanation": "How a lever works", "whiteboard": ["#,
    r#"{"origin": {"x": 0, "y": 0}, "stepName": "Fulcrum", "#,
    r#""explanation": "This is the \"pivot\"."#,
    r#"", "drawingPlan": [{"type": "circle", "id": "pivot", "center": {"x": 10, "y": 10}, "radius": 4}]},"#,
    r#"{"origin": {"x": 200, "y": 0}, "explanation": "Push down here.", "highlightIds": ["pivot"]},"#,
    r#"{"origin": {"x": 400, "y": 0}, "explanation": "The load rises."}]}"#,
];

/// Synthesizer that records what it spoke and when.
#[derive(Default)]
pub struct RecordingSynth {
    pub calls: Mutex<Vec<(String, Instant)>>,
    pub quota_exhausted: bool,
}

impl RecordingSynth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn exhausted() -> Arc<Self> {
        Arc::new(Self {
            quota_exhausted: true,
            ..Default::default()
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn start_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynth {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn synthesize(&self, request: &NarrationRequest) -> Result<AudioClip, NarrationError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.text.clone(), Instant::now()));
        if self.quota_exhausted {
            return Err(NarrationError::QuotaExceeded {
                message: "Speech quota exhausted. Please try again later.".to_string(),
            });
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(AudioClip {
            mime_type: "audio/wav".to_string(),
            data: request.text.as_bytes().to_vec(),
        })
    }
}

/// Provider that streams text chunks with a pause between each.
pub struct PacedProvider {
    config: ProviderConfig,
    chunks: Vec<String>,
    pause: Duration,
    pub finished_at: Mutex<Option<Instant>>,
}

impl PacedProvider {
    pub fn new(chunks: &[&str], pause: Duration) -> Arc<Self> {
        Arc::new(Self {
            config: ProviderConfig::default(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            pause,
            finished_at: Mutex::new(None),
        })
    }
}

#[async_trait]
impl LlmProvider for PacedProvider {
    fn name(&self) -> &'static str {
        "paced"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream_message(
        &self,
        _messages: Vec<Message>,
        _system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<LlmResponse> {
        for chunk in &self.chunks {
            tokio::time::sleep(self.pause).await;
            let _ = tx
                .send(UnifiedStreamEvent::TextDelta {
                    content: chunk.clone(),
                })
                .await;
        }
        let _ = tx
            .send(UnifiedStreamEvent::Complete {
                stop_reason: Some("stop".to_string()),
            })
            .await;
        *self.finished_at.lock().unwrap() = Some(Instant::now());

        Ok(LlmResponse {
            content: Some(self.chunks.concat()),
            thinking: None,
            stop_reason: StopReason::EndTurn,
            usage: UsageStats {
                input_tokens: 12,
                output_tokens: 340,
            },
            model: self.config.model.clone(),
        })
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
