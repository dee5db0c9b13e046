//! LLM Types
//!
//! Request, response and error types for lesson-plan generation backends.

use serde::{Deserialize, Serialize};

/// Supported generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Gemini,
    OpenAI,
    DeepSeek,
    Ollama,
    /// Recorded transcript played back without network access
    Replay,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Gemini => write!(f, "gemini"),
            ProviderType::OpenAI => write!(f, "openai"),
            ProviderType::DeepSeek => write!(f, "deepseek"),
            ProviderType::Ollama => write!(f, "ollama"),
            ProviderType::Replay => write!(f, "replay"),
        }
    }
}

/// Which backend serves generation. Credentials are supplied by whoever
/// constructs the provider and are never part of this config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub provider: ProviderType,
    pub model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderType::Gemini,
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A plain-text conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Number of input/prompt tokens
    pub input_tokens: u32,
    /// Number of output/completion tokens
    pub output_tokens: u32,
}

/// Stop reason for the response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response
    EndTurn,
    /// Hit max tokens limit
    MaxTokens,
    /// Stopped at a stop sequence
    StopSequence,
    /// Other/unknown reason
    Other(String),
}

impl From<&str> for StopReason {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "end_turn" | "stop" => StopReason::EndTurn,
            "max_tokens" | "length" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// Response from an LLM provider once its stream has finished
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Text content of the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Thinking/reasoning content (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Why the response ended
    pub stop_reason: StopReason,
    /// Token usage statistics
    pub usage: UsageStats,
    /// The model that generated the response
    pub model: String,
}

impl LlmResponse {
    /// Whether generation was cut off by the token limit. A truncated lesson
    /// usually fails recovery, so callers log this next to the parse error.
    pub fn is_truncated(&self) -> bool {
        self.stop_reason == StopReason::MaxTokens
    }
}

/// Error types for LLM operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Account or project quota exhausted
    QuotaExceeded { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Response parsing error
    ParseError { message: String },
    /// Provider not available (e.g., Ollama not running)
    ProviderUnavailable { message: String },
    /// Other error
    Other { message: String },
}

impl LlmError {
    /// Quota and rate-limit signals. These are surfaced to the caller and never
    /// retried inside the core.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. } | LlmError::QuotaExceeded { .. }
        )
    }

    /// Classify an error event a vendor reported mid-stream by its code.
    ///
    /// Returns `None` for codes with no known meaning; those stay stream errors.
    pub fn from_stream_code(code: &str, message: &str) -> Option<LlmError> {
        let code = code.trim();
        let lower_code = code.to_ascii_lowercase();
        let mentions_quota = {
            let lower = message.to_ascii_lowercase();
            lower.contains("quota") || lower.contains("resource_exhausted")
        };
        let message = message.to_string();
        let status = code.parse::<u16>().ok();

        match (lower_code.as_str(), status) {
            ("resource_exhausted" | "insufficient_quota" | "quota_exceeded", _) => {
                Some(LlmError::QuotaExceeded { message })
            }
            (_, Some(429)) | ("rate_limit_exceeded" | "rate_limited", _) if mentions_quota => {
                Some(LlmError::QuotaExceeded { message })
            }
            (_, Some(429)) | ("rate_limit_exceeded" | "rate_limited", _) => {
                Some(LlmError::RateLimited {
                    message,
                    retry_after: None,
                })
            }
            (_, Some(403)) if mentions_quota => Some(LlmError::QuotaExceeded { message }),
            (_, Some(401 | 403)) | ("unauthenticated" | "permission_denied" | "invalid_api_key", _) => {
                Some(LlmError::AuthenticationFailed { message })
            }
            (_, Some(s @ 500..=599)) => Some(LlmError::ServerError {
                message,
                status: Some(s),
            }),
            ("unavailable" | "internal" | "overloaded_error", _) => Some(LlmError::ServerError {
                message,
                status: None,
            }),
            _ => None,
        }
    }

    /// Suggested wait in seconds for rate-limited responses.
    pub fn retry_after_secs(&self) -> Option<u32> {
        match self {
            LlmError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Human-readable message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            LlmError::RateLimited { retry_after, .. } => match retry_after {
                Some(secs) => format!(
                    "The AI service is receiving too many requests. Please try again in {} seconds.",
                    secs
                ),
                None => "The AI service is receiving too many requests. Please try again shortly."
                    .to_string(),
            },
            LlmError::QuotaExceeded { .. } => {
                "The AI service quota has been used up. Please try again later.".to_string()
            }
            LlmError::AuthenticationFailed { .. } => {
                "The AI service rejected the configured credentials.".to_string()
            }
            LlmError::ProviderUnavailable { .. } => {
                "The AI service could not be reached. Check your connection and retry.".to_string()
            }
            _ => "Something went wrong while generating the lesson. Please retry.".to_string(),
        }
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::QuotaExceeded { message } => {
                write!(f, "Quota exceeded: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            LlmError::ProviderUnavailable { message } => {
                write!(f, "Provider unavailable: {}", message)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
