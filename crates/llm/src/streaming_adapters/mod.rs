//! Provider-Specific Stream Adapters
//!
//! Each adapter handles the unique streaming format of its provider family.

pub mod chat_completions;

pub use chat_completions::ChatCompletionsAdapter;
