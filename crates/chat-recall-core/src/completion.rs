//! Text completion capability.

use anyhow::Result;
use async_trait::async_trait;

/// A chat-completion service.
///
/// Each call carries exactly two turns: the composed system instruction and
/// the raw user message. Conversation history is not part of this contract.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Generate a reply to `user` under the `system` instruction.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}
