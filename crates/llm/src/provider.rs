//! LLM Provider Trait
//!
//! Defines the interface the generation session uses to obtain a streamed
//! lesson plan. Concrete vendor transports live outside this workspace; they
//! implement this trait and push `UnifiedStreamEvent`s into the channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{LlmResponse, LlmResult, Message, ProviderConfig};
use chalkline_core::streaming::UnifiedStreamEvent;

/// Trait that all generation backends must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Returns whether this provider may emit thinking/reasoning blocks.
    fn supports_thinking(&self) -> bool {
        false
    }

    /// Stream a message response via a channel.
    ///
    /// Text deltas must be sent in generation order. The provider returns once
    /// the upstream stream has ended; dropping `tx` signals EOF to the consumer.
    ///
    /// # Returns
    /// Final complete response after streaming
    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is healthy and reachable.
    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}
