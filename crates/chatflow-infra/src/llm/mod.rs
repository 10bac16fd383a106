//! Generative AI provider implementations.
//!
//! Two distinct native request shapes behind the one
//! [`AiProvider`](chatflow_core::provider::AiProvider) interface:
//!
//! - [`openai::OpenAiProvider`] -- multi-turn chat-completions API
//!   (history becomes alternating user/assistant turns)
//! - [`gemini::GeminiProvider`] -- single-prompt completion-style API
//!   (history is flattened into one prompt string)
//!
//! API keys are wrapped in [`secrecy::SecretString`] and never appear in
//! Debug output or logs.

pub mod gemini;
pub mod openai;

use secrecy::SecretString;

use chatflow_core::box_provider::BoxAiProvider;
use chatflow_core::provider::ProviderFactory;
use chatflow_types::bot::{AiConfig, AiProviderKind};

use self::gemini::GeminiProvider;
use self::openai::OpenAiProvider;

/// Builds the provider for a bot's AI config, applying the per-bot ->
/// process-wide API-key fallback.
pub struct ProviderSelector {
    process_key: Option<SecretString>,
}

impl ProviderSelector {
    /// `process_key` is the process-wide fallback used when a bot config
    /// carries no key of its own.
    pub fn new(process_key: Option<SecretString>) -> Self {
        Self { process_key }
    }

    /// Read the process-wide key from the `CHATFLOW_AI_KEY` environment
    /// variable.
    pub fn from_env() -> Self {
        let process_key = std::env::var("CHATFLOW_AI_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);
        Self::new(process_key)
    }
}

impl ProviderFactory for ProviderSelector {
    fn provider_for(&self, config: &AiConfig) -> Option<BoxAiProvider> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from)
            .or_else(|| self.process_key.clone())?;

        Some(match config.provider {
            AiProviderKind::OpenAi => BoxAiProvider::new(OpenAiProvider::new(api_key)),
            AiProviderKind::Gemini => BoxAiProvider::new(GeminiProvider::new(api_key)),
        })
    }
}
