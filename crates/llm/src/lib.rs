//! Chalkline LLM
//!
//! Provider abstraction for lesson-plan generation backends:
//! - `LlmProvider` trait (streamed generation into a channel)
//! - `LlmError` taxonomy, including the quota/rate-limit family
//! - chat-completions stream adapter with `<think>` separation
//! - `ReplayProvider` for recorded transcripts

pub mod provider;
pub mod replay;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use provider::LlmProvider;
pub use replay::ReplayProvider;
pub use types::*;

// Re-export streaming adapters
pub use streaming_adapters::ChatCompletionsAdapter;
