//! Generation Session
//!
//! One prompt, one streamed plan. Text deltas go through a fresh
//! `StreamingPlanParser`; the first step's narration is dispatched the moment
//! it completes, while the plan keeps streaming. Once the stream ends the
//! accumulated text is recovered into a `Plan`.

use chalkline_core::{CoreError, UnifiedStreamEvent};
use chalkline_llm::{LlmError, LlmProvider, LlmResponse, Message, UsageStats};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::models::plan::Plan;
use crate::models::settings::GenerationSettings;
use crate::services::narration::{NarrationDispatcher, NarrationHandle};
use crate::services::plan_stream::{PlanFieldNames, StreamingPlanParser};
use crate::services::recovery::parse_plan_with_preview;
use crate::utils::error::{AppError, AppResult};

/// Outcome of a successful generation.
#[derive(Debug)]
pub struct GeneratedLesson {
    pub session_id: String,
    pub plan: Plan,
    /// Synthesis started for step 0 while the plan was still streaming
    pub early_narration: Option<NarrationHandle>,
    /// Whether the first narration completed before the stream ended
    pub narration_detected_early: bool,
    pub usage: UsageStats,
    pub truncated: bool,
}

/// A single prompt-to-plan run.
pub struct GenerationSession {
    id: String,
    provider: Arc<dyn LlmProvider>,
    narrator: Option<NarrationDispatcher>,
    settings: GenerationSettings,
}

impl GenerationSession {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        narrator: Option<NarrationDispatcher>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            provider,
            narrator,
            settings,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn field_names(&self) -> PlanFieldNames {
        PlanFieldNames {
            sequence_key: self.settings.sequence_key.clone(),
            narration_key: self.settings.narration_key.clone(),
        }
    }

    /// Stream a plan for `prompt`, narrating step 0 as early as possible.
    pub async fn run(&self, prompt: &str) -> AppResult<GeneratedLesson> {
        if prompt.trim().is_empty() {
            return Err(AppError::validation("Prompt must not be empty"));
        }

        tracing::info!(
            session_id = %self.id,
            provider = self.provider.name(),
            model = self.provider.model(),
            "generation: session started"
        );

        let (tx, mut rx) = mpsc::channel::<UnifiedStreamEvent>(self.settings.stream_buffer);
        let provider = Arc::clone(&self.provider);
        let messages = vec![Message::user(prompt)];
        let system = self.settings.system_prompt.clone();
        let stream_handle = tokio::spawn(async move {
            provider
                .stream_message(messages, system, tx)
                .await
        });

        let mut parser = StreamingPlanParser::with_fields(self.field_names());
        let mut early_narration = None;
        let mut usage = UsageStats::default();
        let mut stream_error: Option<(String, Option<String>)> = None;
        let mut completed = false;
        let mut thinking_chars = 0usize;

        // Drain until the provider drops its sender so it never blocks on a
        // full channel; events after a terminal one are ignored.
        while let Some(event) = rx.recv().await {
            match event {
                UnifiedStreamEvent::TextDelta { content } => {
                    if completed || stream_error.is_some() {
                        continue;
                    }
                    let detection = parser.feed(&content);
                    if let Some(text) = detection.explanation {
                        early_narration = self.dispatch_early(text);
                    }
                }
                UnifiedStreamEvent::ThinkingDelta { content, .. } => {
                    thinking_chars += content.chars().count();
                }
                UnifiedStreamEvent::Usage {
                    input_tokens,
                    output_tokens,
                } => {
                    usage = UsageStats {
                        input_tokens,
                        output_tokens,
                    };
                }
                UnifiedStreamEvent::Error { message, code } => {
                    tracing::error!(
                        session_id = %self.id,
                        code = ?code,
                        error = %message,
                        "generation: upstream stream error"
                    );
                    stream_error.get_or_insert((message, code));
                }
                UnifiedStreamEvent::Complete { stop_reason } => {
                    tracing::debug!(session_id = %self.id, stop_reason = ?stop_reason, "generation: stream complete");
                    completed = true;
                }
                UnifiedStreamEvent::ThinkingStart { .. } | UnifiedStreamEvent::ThinkingEnd { .. } => {}
            }
        }

        let response: LlmResponse = match stream_handle.await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(session_id = %self.id, error = %e, "generation: provider failed");
                return Err(AppError::Llm(e));
            }
            Err(e) => {
                return Err(AppError::internal(format!("Provider task failed: {}", e)));
            }
        };
        if let Some((message, code)) = stream_error {
            let classified = code
                .as_deref()
                .and_then(|c| LlmError::from_stream_code(c, &message));
            return Err(match classified {
                Some(err) => AppError::Llm(err),
                None => CoreError::upstream(message, code).into(),
            });
        }
        if response.usage != UsageStats::default() {
            usage = response.usage.clone();
        }

        let narration_detected_early = parser.has_fired();
        let mut text = parser.into_text();
        if text.trim().is_empty() {
            if let Some(content) = response.content.clone() {
                tracing::debug!(session_id = %self.id, "generation: no deltas, using final content");
                text = content;
            }
        }

        let plan = parse_plan_with_preview(&text, self.settings.preview_chars).map_err(|e| {
            tracing::warn!(
                session_id = %self.id,
                truncated = response.is_truncated(),
                error = %e,
                "generation: plan recovery failed"
            );
            AppError::from(e)
        })?;

        tracing::info!(
            session_id = %self.id,
            steps = plan.whiteboard.len(),
            early = narration_detected_early,
            thinking_chars,
            output_tokens = usage.output_tokens,
            "generation: session finished"
        );

        Ok(GeneratedLesson {
            session_id: self.id.clone(),
            plan,
            early_narration,
            narration_detected_early,
            usage,
            truncated: response.is_truncated(),
        })
    }

    fn dispatch_early(&self, text: String) -> Option<NarrationHandle> {
        let narrator = self.narrator.as_ref()?;
        match narrator.dispatch(text) {
            Ok(handle) => {
                tracing::info!(session_id = %self.id, "generation: early narration dispatched");
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "generation: early narration rejected");
                None
            }
        }
    }
}
