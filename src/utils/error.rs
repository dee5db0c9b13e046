//! `AppError` folds every subsystem failure into one enum and marks the
//! ones worth retrying later.

use chalkline_core::CoreError;
use chalkline_llm::LlmError;
use thiserror::Error;

use crate::services::narration::{NarrationError, RateLimiterError};
use crate::services::recovery::{MalformedResponseError, PlanParseError};

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Client used outside its init/close lifecycle
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Foundational errors from chalkline-core
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Generation backend errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Finished response held no recoverable JSON
    #[error(transparent)]
    Malformed(#[from] MalformedResponseError),

    /// Recovered JSON was not a usable plan
    #[error(transparent)]
    Plan(#[from] PlanParseError),

    #[error(transparent)]
    RateLimiter(#[from] RateLimiterError),

    #[error(transparent)]
    Narration(#[from] NarrationError),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a lifecycle error
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether retrying later may succeed (quota and rate limits).
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Llm(e) => e.is_transient(),
            AppError::Narration(NarrationError::QuotaExceeded { .. }) => true,
            AppError::RateLimiter(RateLimiterError::QueueFull { .. }) => true,
            _ => false,
        }
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Llm(e) => e.user_message(),
            AppError::Narration(NarrationError::QuotaExceeded { message }) => message.clone(),
            other => other.to_string(),
        }
    }
}

// Implement conversion to String for command-style error returns
impl From<AppError> for String {
    fn from(err: AppError) -> Self {
        err.to_string()
    }
}
