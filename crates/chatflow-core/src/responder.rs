//! AI responder: one bounded, failure-absorbing provider call.
//!
//! Assembles the system instruction, loads the chat's short-term memory,
//! and issues a single request under a hard timeout. On success the
//! exchange is remembered; on ANY failure (auth, rate-limit, timeout,
//! malformed response) the error is logged and `None` is returned. This
//! component never raises to the orchestrator -- fallback decisions all
//! live there.

use std::time::Duration;

use chatflow_types::bot::AiConfig;
use chatflow_types::memory::MemoryEntry;

use crate::box_provider::BoxAiProvider;
use crate::memory::ConversationStore;
use crate::provider::AiRequest;

/// Hard ceiling on one provider call.
pub const AI_TIMEOUT_MS: u64 = 15_000;

/// System instruction used when neither purpose nor custom prompt is set.
const DEFAULT_SYSTEM: &str =
    "You are a helpful assistant. Answer briefly and in the user's language.";

/// Ask the configured provider to answer `query` for `chat_id`.
///
/// Returns the response text, or `None` on any failure.
pub async fn respond<M: ConversationStore>(
    provider: &BoxAiProvider,
    memory: &M,
    config: &AiConfig,
    chat_id: &str,
    query: &str,
) -> Option<String> {
    let request = AiRequest {
        model: config.model.clone(),
        system: build_system_instruction(config),
        history: memory.recent(chat_id).await,
        query: query.to_string(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let call = provider.complete(&request);
    match tokio::time::timeout(Duration::from_millis(AI_TIMEOUT_MS), call).await {
        Ok(Ok(text)) => {
            memory.append(chat_id, MemoryEntry::new(query, text.clone())).await;
            Some(text)
        }
        Ok(Err(err)) => {
            tracing::warn!(
                provider = provider.name(),
                model = %config.model,
                error = %err,
                "ai call failed"
            );
            None
        }
        Err(_) => {
            tracing::warn!(
                provider = provider.name(),
                model = %config.model,
                timeout_ms = AI_TIMEOUT_MS,
                "ai call timed out"
            );
            None
        }
    }
}

/// Purpose sentence + custom prompt, or the generic default when both are
/// absent.
fn build_system_instruction(config: &AiConfig) -> String {
    let mut parts = Vec::new();
    if let Some(purpose) = config.purpose.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        parts.push(format!("You are a helpful assistant for {purpose}."));
    }
    if let Some(prompt) = config
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        parts.push(prompt.to_string());
    }
    if parts.is_empty() {
        return DEFAULT_SYSTEM.to_string();
    }
    parts.join("\n\n")
}
