//! OpenAiProvider -- chat-style [`AiProvider`] implementation.
//!
//! Sends requests to the OpenAI chat-completions API
//! (`/v1/chat/completions`). Conversation memory becomes alternating
//! user/assistant turns after the system message; this is the multi-turn
//! shape of the two supported provider APIs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use chatflow_core::provider::{AiProvider, AiRequest};
use chatflow_observe::genai_attrs;
use chatflow_types::error::AiError;

/// OpenAI chat-completions provider.
///
/// # API Key Security
///
/// The API key is stored as a [`SecretString`] and only exposed when
/// constructing the Authorization header. The struct deliberately does
/// not derive Debug.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

/// HTTP-level timeout; the responder applies its own tighter deadline on
/// top of this.
const HTTP_TIMEOUT_SECS: u64 = 20;

impl OpenAiProvider {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://api.openai.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

/// Request body for the chat-completions endpoint.
#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// System message first, then remembered exchanges as alternating turns,
/// then the current query.
fn build_messages(request: &AiRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.history.len() * 2 + 2);
    messages.push(ChatMessage {
        role: "system",
        content: request.system.clone(),
    });
    for entry in &request.history {
        messages.push(ChatMessage {
            role: "user",
            content: entry.query.clone(),
        });
        messages.push(ChatMessage {
            role: "assistant",
            content: entry.response.clone(),
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: request.query.clone(),
    });
    messages
}

fn map_send_error(err: reqwest::Error) -> AiError {
    if err.is_timeout() {
        AiError::Timeout(HTTP_TIMEOUT_SECS * 1_000)
    } else {
        AiError::Network(err.to_string())
    }
}

/// Map a non-success HTTP status to the typed failure taxonomy.
fn map_status(status: reqwest::StatusCode, retry_after_ms: Option<u64>, body: &str) -> AiError {
    match status.as_u16() {
        401 | 403 => AiError::AuthenticationFailed,
        429 => AiError::RateLimited { retry_after_ms },
        _ => AiError::Provider(format!("status {status}: {}", truncate(body, 200))),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}

impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &AiRequest) -> Result<String, AiError> {
        let span = tracing::info_span!("chat", model = %request.model);
        span.set_attribute(genai_attrs::GEN_AI_OPERATION_NAME, genai_attrs::OP_CHAT);
        span.set_attribute(
            genai_attrs::GEN_AI_PROVIDER_NAME,
            genai_attrs::PROVIDER_OPENAI,
        );
        span.set_attribute(genai_attrs::GEN_AI_REQUEST_MODEL, request.model.clone());
        span.set_attribute(
            genai_attrs::GEN_AI_REQUEST_TEMPERATURE,
            request.temperature,
        );
        span.set_attribute(
            genai_attrs::GEN_AI_REQUEST_MAX_TOKENS,
            i64::from(request.max_tokens),
        );
        self.send_chat(request).instrument(span).await
    }
}

impl OpenAiProvider {
    async fn send_chat(&self, request: &AiRequest) -> Result<String, AiError> {
        let body = ChatRequest {
            model: request.model.clone(),
            messages: build_messages(request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1_000);
            let text = response.text().await.unwrap_or_default();
            return Err(map_status(status, retry_after_ms, &text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| AiError::MalformedResponse(err.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AiError::MalformedResponse("empty completion".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_types::memory::MemoryEntry;

    fn request_with_history() -> AiRequest {
        AiRequest {
            model: "gpt-4o-mini".to_string(),
            system: "be brief".to_string(),
            history: vec![
                MemoryEntry::new("first q", "first a"),
                MemoryEntry::new("second q", "second a"),
            ],
            query: "third q".to_string(),
            temperature: 0.7,
            max_tokens: 128,
        }
    }

    #[test]
    fn test_messages_are_system_then_turns_then_query() {
        let messages = build_messages(&request_with_history());
        let shape: Vec<(&str, &str)> = messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("system", "be brief"),
                ("user", "first q"),
                ("assistant", "first a"),
                ("user", "second q"),
                ("assistant", "second a"),
                ("user", "third q"),
            ]
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status(reqwest::StatusCode::UNAUTHORIZED, None, ""),
            AiError::AuthenticationFailed
        ));
        assert!(matches!(
            map_status(reqwest::StatusCode::TOO_MANY_REQUESTS, Some(2_000), ""),
            AiError::RateLimited {
                retry_after_ms: Some(2_000)
            }
        ));
        assert!(matches!(
            map_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, None, "oops"),
            AiError::Provider(_)
        ));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"choices":[{"message":{"content":" 42 "}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        let content = parsed.choices[0].message.content.as_deref().unwrap();
        assert_eq!(content.trim(), "42");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
