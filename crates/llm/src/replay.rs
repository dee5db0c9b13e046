//! Replay Provider
//!
//! Plays a recorded chat-completions SSE transcript back through the stream
//! adapter, emitting the same events a live vendor transport would. Used for
//! offline reproduction of generation bugs and for tests.

use async_trait::async_trait;
use chalkline_core::streaming::{StreamAdapter, UnifiedStreamEvent};
use tokio::sync::mpsc;

use crate::provider::LlmProvider;
use crate::streaming_adapters::ChatCompletionsAdapter;
use crate::types::{
    LlmError, LlmResponse, LlmResult, Message, ProviderConfig, ProviderType, StopReason, UsageStats,
};

/// Provider that replays recorded SSE lines.
pub struct ReplayProvider {
    config: ProviderConfig,
    lines: Vec<String>,
    /// Error returned after the transcript has been replayed
    failure: Option<LlmError>,
    healthy: bool,
}

impl ReplayProvider {
    /// Build from raw SSE lines (`data: {...}`, `data: [DONE]`, blank lines).
    pub fn from_sse_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = ProviderConfig {
            provider: ProviderType::Replay,
            model: "replay".to_string(),
        };
        Self {
            config,
            lines: lines.into_iter().map(Into::into).collect(),
            failure: None,
            healthy: true,
        }
    }

    /// Build a transcript where each text chunk is one content delta.
    pub fn from_text_chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines: Vec<String> = chunks
            .into_iter()
            .map(|chunk| {
                let event = serde_json::json!({
                    "choices": [{ "delta": { "content": chunk.as_ref() } }]
                });
                format!("data: {}", event)
            })
            .collect();
        lines.push(r#"data: {"choices":[{"finish_reason":"stop"}]}"#.to_string());
        lines.push("data: [DONE]".to_string());
        Self::from_sse_lines(lines)
    }

    /// Fail with `error` once the transcript has been replayed.
    pub fn with_failure(mut self, error: LlmError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Make `health_check` report the provider as unavailable.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }
}

#[async_trait]
impl LlmProvider for ReplayProvider {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_thinking(&self) -> bool {
        true
    }

    async fn stream_message(
        &self,
        _messages: Vec<Message>,
        _system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<LlmResponse> {
        let mut adapter = ChatCompletionsAdapter::new("replay");
        let mut content = String::new();
        let mut thinking = String::new();
        let mut usage = UsageStats::default();
        let mut stop_reason = StopReason::EndTurn;

        for line in &self.lines {
            let events = adapter.adapt(line).map_err(|e| {
                tracing::warn!(error = %e, "replay: transcript line could not be adapted");
                LlmError::ParseError {
                    message: e.to_string(),
                }
            })?;

            for event in events {
                match &event {
                    UnifiedStreamEvent::TextDelta { content: c } => content.push_str(c),
                    UnifiedStreamEvent::ThinkingDelta { content: c, .. } => thinking.push_str(c),
                    UnifiedStreamEvent::Usage {
                        input_tokens,
                        output_tokens,
                    } => {
                        usage = UsageStats {
                            input_tokens: *input_tokens,
                            output_tokens: *output_tokens,
                        };
                    }
                    UnifiedStreamEvent::Complete {
                        stop_reason: Some(reason),
                    } => stop_reason = StopReason::from(reason.as_str()),
                    _ => {}
                }
                if tx.send(event).await.is_err() {
                    tracing::debug!("replay: receiver dropped, stopping playback");
                    return Err(LlmError::Other {
                        message: "stream receiver dropped".to_string(),
                    });
                }
            }
        }

        if let Some(err) = &self.failure {
            let _ = tx
                .send(UnifiedStreamEvent::Error {
                    message: err.to_string(),
                    code: None,
                })
                .await;
            return Err(err.clone());
        }

        Ok(LlmResponse {
            content: (!content.is_empty()).then_some(content),
            thinking: (!thinking.is_empty()).then_some(thinking),
            stop_reason,
            usage,
            model: self.config.model.clone(),
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(LlmError::ProviderUnavailable {
                message: "replay provider marked unhealthy".to_string(),
            })
        }
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
