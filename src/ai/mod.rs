pub mod anthropic;

use async_trait::async_trait;

use crate::error::BotError;

/// Trait for the AI provider that writes review narratives.
///
/// Object-safe for dynamic dispatch via `Arc<dyn AiHandler>` so the review
/// pipeline can run against a mock in tests.
#[async_trait]
pub trait AiHandler: Send + Sync {
    /// Send a completion request and return the model's text response.
    ///
    /// `system` may be empty; `user` carries the rendered review prompt.
    /// May fail or time out; callers absorb that per file.
    async fn complete(&self, system: &str, user: &str) -> Result<String, BotError>;
}
