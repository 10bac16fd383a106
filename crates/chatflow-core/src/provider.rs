//! AiProvider trait definition.
//!
//! One uniform interface over generative providers regardless of their
//! native request shape: infra implements it for a multi-turn chat-style
//! API and for a single-prompt completion-style API. Uses native async fn
//! in traits (RPITIT, Rust 2024 edition); dynamic dispatch goes through
//! [`crate::box_provider::BoxAiProvider`].

use chatflow_types::error::AiError;
use chatflow_types::memory::MemoryEntry;

/// A fully-assembled request to a generative provider.
#[derive(Debug, Clone)]
pub struct AiRequest {
    pub model: String,
    /// System instruction (purpose sentence + custom prompt, or the
    /// generic default).
    pub system: String,
    /// Recent exchanges for this chat, oldest first.
    pub history: Vec<MemoryEntry>,
    /// The inbound message text being answered.
    pub query: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Trait for generative AI provider backends.
///
/// Implementations live in chatflow-infra. How `history` is encoded is
/// the provider's business: chat-style APIs turn it into alternating
/// user/assistant turns, completion-style APIs flatten it into the prompt.
pub trait AiProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Send one completion request and receive the response text.
    fn complete(
        &self,
        request: &AiRequest,
    ) -> impl std::future::Future<Output = Result<String, AiError>> + Send;
}

/// Builds the provider for a specific bot's AI configuration.
///
/// Returns `None` when no provider can be built (unknown backend, no API
/// key anywhere); the responder treats that the same as a failed call.
pub trait ProviderFactory: Send + Sync {
    fn provider_for(
        &self,
        config: &chatflow_types::bot::AiConfig,
    ) -> Option<crate::box_provider::BoxAiProvider>;
}
