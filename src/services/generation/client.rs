//! Lesson Client
//!
//! Explicitly constructed entry point that owns the process's narration rate
//! limiter and hands out generation sessions. Lifecycle:
//! `new` -> `init` (provider health check) -> `generate`* -> `close`.

use chalkline_llm::LlmProvider;
use std::sync::{Arc, Mutex};

use super::session::{GeneratedLesson, GenerationSession};
use crate::models::settings::{AppConfig, GenerationSettings};
use crate::services::narration::{
    NarrationDispatcher, NarrationHandle, RateLimiter, RateLimiterConfig, SpeechSynthesizer,
};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Created,
    Ready,
    Closed,
}

pub struct LessonClient {
    provider: Arc<dyn LlmProvider>,
    narrator: NarrationDispatcher,
    settings: GenerationSettings,
    state: Mutex<ClientState>,
}

impl LessonClient {
    /// Build a client from validated configuration.
    pub fn new(
        config: &AppConfig,
        provider: Arc<dyn LlmProvider>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> AppResult<Self> {
        config.validate().map_err(AppError::validation)?;

        let limiter = RateLimiter::new(RateLimiterConfig {
            max_calls_per_minute: config.narration.max_calls_per_minute,
            window: config.narration.window(),
            max_queue_len: config.narration.max_queue_len,
        });
        let narrator = NarrationDispatcher::new(synthesizer, limiter).with_voice(
            config.narration.voice.clone(),
            config.narration.language_code.clone(),
        );

        Ok(Self {
            provider,
            narrator,
            settings: config.generation.clone(),
            state: Mutex::new(ClientState::Created),
        })
    }

    fn current_state(&self) -> ClientState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: ClientState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }

    pub fn state(&self) -> ClientState {
        self.current_state()
    }

    /// Check the provider and mark the client ready. Idempotent.
    pub async fn init(&self) -> AppResult<()> {
        match self.current_state() {
            ClientState::Ready => return Ok(()),
            ClientState::Closed => return Err(AppError::lifecycle("Client has been closed")),
            ClientState::Created => {}
        }

        self.provider.health_check().await?;

        // close() may have raced the health check
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == ClientState::Closed {
            return Err(AppError::lifecycle("Client has been closed"));
        }
        *state = ClientState::Ready;
        tracing::info!(
            provider = self.provider.name(),
            model = self.provider.model(),
            "lesson client ready"
        );
        Ok(())
    }

    /// Reject further sessions. Narration already queued still completes.
    pub fn close(&self) {
        self.set_state(ClientState::Closed);
        tracing::info!(
            pending_narration = self.narrator.limiter().queue_length(),
            "lesson client closed"
        );
    }

    pub fn limiter(&self) -> &RateLimiter {
        self.narrator.limiter()
    }

    /// New session bound to this client's provider and narrator.
    pub fn session(&self) -> AppResult<GenerationSession> {
        match self.current_state() {
            ClientState::Ready => Ok(GenerationSession::new(
                Arc::clone(&self.provider),
                Some(self.narrator.clone()),
                self.settings.clone(),
            )),
            ClientState::Created => Err(AppError::lifecycle("Client not initialized")),
            ClientState::Closed => Err(AppError::lifecycle("Client has been closed")),
        }
    }

    /// Generate a lesson for `prompt`.
    pub async fn generate(&self, prompt: &str) -> AppResult<GeneratedLesson> {
        self.session()?.run(prompt).await
    }

    /// Queue narration for the steps not narrated during streaming.
    pub fn narrate_remaining(&self, lesson: &GeneratedLesson) -> Vec<(usize, NarrationHandle)> {
        let skip = usize::from(lesson.early_narration.is_some());
        self.narrator.narrate_plan(&lesson.plan, skip)
    }
}
