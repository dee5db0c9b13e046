//! Settings Models
//!
//! Application configuration stored in config.json.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration stored in config.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Speech synthesis quota and voice
    #[serde(default)]
    pub narration: NarrationSettings,
    /// Plan streaming and recovery knobs
    #[serde(default)]
    pub generation: GenerationSettings,
}

/// Narration quota and voice selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationSettings {
    /// Speech synthesis calls allowed per window
    #[serde(default = "default_max_calls_per_minute")]
    pub max_calls_per_minute: u32,
    /// Sliding window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Reject new narration instead of queueing past this many pending calls
    #[serde(default)]
    pub max_queue_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default = "default_language_code")]
    pub language_code: String,
}

fn default_max_calls_per_minute() -> u32 {
    10
}

fn default_window_secs() -> u64 {
    60
}

fn default_language_code() -> String {
    "en-US".to_string()
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            max_calls_per_minute: default_max_calls_per_minute(),
            window_secs: default_window_secs(),
            max_queue_len: None,
            voice: None,
            language_code: default_language_code(),
        }
    }
}

impl NarrationSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Streaming parser and recovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Top-level key holding the step array
    #[serde(default = "default_sequence_key")]
    pub sequence_key: String,
    /// Step key holding the narration text
    #[serde(default = "default_narration_key")]
    pub narration_key: String,
    /// Capacity of the provider event channel
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
    /// Characters of a malformed response kept in errors
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// System prompt sent with every generation request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_sequence_key() -> String {
    "whiteboard".to_string()
}

fn default_narration_key() -> String {
    "explanation".to_string()
}

fn default_stream_buffer() -> usize {
    256
}

fn default_preview_chars() -> usize {
    200
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            sequence_key: default_sequence_key(),
            narration_key: default_narration_key(),
            stream_buffer: default_stream_buffer(),
            preview_chars: default_preview_chars(),
            system_prompt: None,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub max_calls_per_minute: Option<u32>,
    pub window_secs: Option<u64>,
    pub max_queue_len: Option<Option<usize>>,
    pub voice: Option<String>,
    pub language_code: Option<String>,
    pub system_prompt: Option<String>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(max) = update.max_calls_per_minute {
            self.narration.max_calls_per_minute = max;
        }
        if let Some(secs) = update.window_secs {
            self.narration.window_secs = secs;
        }
        if let Some(len) = update.max_queue_len {
            self.narration.max_queue_len = len;
        }
        if let Some(voice) = update.voice {
            self.narration.voice = Some(voice);
        }
        if let Some(code) = update.language_code {
            self.narration.language_code = code;
        }
        if let Some(prompt) = update.system_prompt {
            self.generation.system_prompt = Some(prompt);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.narration.max_calls_per_minute == 0 {
            return Err("maxCallsPerMinute must be at least 1".to_string());
        }
        if self.narration.window_secs == 0 {
            return Err("windowSecs must be at least 1".to_string());
        }
        if self.narration.max_queue_len == Some(0) {
            return Err("maxQueueLen must be at least 1 when set".to_string());
        }
        if self.generation.sequence_key.trim().is_empty() {
            return Err("sequenceKey must not be empty".to_string());
        }
        if self.generation.narration_key.trim().is_empty() {
            return Err("narrationKey must not be empty".to_string());
        }
        if self.generation.stream_buffer == 0 {
            return Err("streamBuffer must be at least 1".to_string());
        }
        Ok(())
    }
}
