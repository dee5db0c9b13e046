//! Narration Dispatcher
//!
//! Turns step narration into rate-limited speech synthesis calls. Dispatch is
//! fire-and-forget relative to plan streaming: the caller gets a
//! `NarrationHandle` it may await later, or drop.

use async_trait::async_trait;
use chalkline_llm::LlmError;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

use super::rate_limiter::{RateLimiter, RateLimiterError};
use crate::models::plan::Plan;

/// Narration failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NarrationError {
    /// Nothing to speak; no quota was consumed
    #[error("Narration text is empty")]
    EmptyText,

    /// Speech quota exhausted upstream. Retrying later may succeed.
    #[error("{message}")]
    QuotaExceeded { message: String },

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error(transparent)]
    RateLimiter(#[from] RateLimiterError),
}

impl From<LlmError> for NarrationError {
    fn from(err: LlmError) -> Self {
        if err.is_transient() {
            NarrationError::QuotaExceeded {
                message: err.user_message(),
            }
        } else {
            NarrationError::Synthesis(err.to_string())
        }
    }
}

/// A single speech synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationRequest {
    pub text: String,
    pub voice: Option<String>,
    pub language_code: String,
}

/// Synthesized audio for one narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Speech synthesis backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    async fn synthesize(&self, request: &NarrationRequest) -> Result<AudioClip, NarrationError>;
}

/// Pending narration for one piece of text.
#[derive(Debug)]
pub struct NarrationHandle {
    text: String,
    task: JoinHandle<Result<AudioClip, NarrationError>>,
}

impl NarrationHandle {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the synthesized clip.
    pub async fn wait(self) -> Result<AudioClip, NarrationError> {
        match self.task.await {
            Ok(result) => result,
            Err(_) => Err(NarrationError::RateLimiter(RateLimiterError::TaskAborted)),
        }
    }
}

/// Dispatches narration through the shared rate limiter.
#[derive(Clone)]
pub struct NarrationDispatcher {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    limiter: RateLimiter,
    voice: Option<String>,
    language_code: String,
}

impl NarrationDispatcher {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, limiter: RateLimiter) -> Self {
        Self {
            synthesizer,
            limiter,
            voice: None,
            language_code: "en-US".to_string(),
        }
    }

    pub fn with_voice(mut self, voice: Option<String>, language_code: impl Into<String>) -> Self {
        self.voice = voice;
        self.language_code = language_code.into();
        self
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Queue synthesis of `text` and return immediately.
    ///
    /// Blank text is rejected without touching the limiter.
    pub fn dispatch(&self, text: impl Into<String>) -> Result<NarrationHandle, NarrationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(NarrationError::EmptyText);
        }

        let request = NarrationRequest {
            text: text.clone(),
            voice: self.voice.clone(),
            language_code: self.language_code.clone(),
        };
        let synthesizer = Arc::clone(&self.synthesizer);
        let call = self.limiter.execute(move || async move {
            tracing::debug!(
                synthesizer = synthesizer.name(),
                chars = request.text.chars().count(),
                "narration: synthesizing"
            );
            synthesizer.synthesize(&request).await
        });

        tracing::info!(
            queued = self.limiter.queue_length(),
            remaining = self.limiter.remaining_calls(),
            "narration: dispatched"
        );

        let task = tokio::spawn(async move {
            let result = call.await?;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "narration: synthesis failed");
            }
            result
        });

        Ok(NarrationHandle { text, task })
    }

    /// Queue narration for every step after the first `skip`, in order.
    ///
    /// Steps with blank narration are skipped.
    pub fn narrate_plan(&self, plan: &Plan, skip: usize) -> Vec<(usize, NarrationHandle)> {
        plan.whiteboard
            .iter()
            .enumerate()
            .skip(skip)
            .filter_map(|(index, step)| match self.dispatch(step.explanation.as_str()) {
                Ok(handle) => Some((index, handle)),
                Err(e) => {
                    tracing::debug!(step = index, error = %e, "narration: step skipped");
                    None
                }
            })
            .collect()
    }
}
