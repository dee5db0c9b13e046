//! Stream-level errors shared by every Chalkline crate.
//!
//! These describe failures of the event stream itself. Plan recovery,
//! narration and rate limiting have their own enums in the root crate.

use thiserror::Error;

use crate::streaming::AdapterError;

#[derive(Error, Debug)]
pub enum CoreError {
    /// The upstream reported an error event mid-stream
    #[error("Upstream stream error: {message}")]
    Upstream {
        message: String,
        code: Option<String>,
    },

    /// A raw stream line could not be turned into events
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn upstream(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            code,
        }
    }

    /// Upstream error code, when the vendor supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Upstream { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
