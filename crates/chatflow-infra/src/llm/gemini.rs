//! GeminiProvider -- completion-style [`AiProvider`] implementation.
//!
//! Sends requests to the Gemini `generateContent` endpoint as a single
//! prompt: system instruction, remembered exchanges, and the current
//! query are flattened into one text part. This is the single-prompt
//! shape of the two supported provider APIs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use chatflow_core::provider::{AiProvider, AiRequest};
use chatflow_observe::genai_attrs;
use chatflow_types::error::AiError;

/// Gemini generateContent provider.
///
/// # API Key Security
///
/// The key travels in the `x-goog-api-key` header (never in the URL, so
/// it cannot leak into request logs) and is stored as a [`SecretString`].
/// The struct deliberately does not derive Debug.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

const HTTP_TIMEOUT_SECS: u64 = 20;

impl GeminiProvider {
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Content,
}

/// Flatten system, history, and the current query into one prompt.
fn flatten_prompt(request: &AiRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str(&request.system);
    prompt.push_str("\n\n");
    for entry in &request.history {
        prompt.push_str("User: ");
        prompt.push_str(&entry.query);
        prompt.push_str("\nAssistant: ");
        prompt.push_str(&entry.response);
        prompt.push('\n');
    }
    prompt.push_str("User: ");
    prompt.push_str(&request.query);
    prompt.push_str("\nAssistant:");
    prompt
}

fn map_send_error(err: reqwest::Error) -> AiError {
    if err.is_timeout() {
        AiError::Timeout(HTTP_TIMEOUT_SECS * 1_000)
    } else {
        AiError::Network(err.to_string())
    }
}

impl AiProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &AiRequest) -> Result<String, AiError> {
        let span = tracing::info_span!("chat", model = %request.model);
        span.set_attribute(genai_attrs::GEN_AI_OPERATION_NAME, genai_attrs::OP_CHAT);
        span.set_attribute(
            genai_attrs::GEN_AI_PROVIDER_NAME,
            genai_attrs::PROVIDER_GEMINI,
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
        self.send_generate(request).instrument(span).await
    }
}

impl GeminiProvider {
    async fn send_generate(&self, request: &AiRequest) -> Result<String, AiError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: flatten_prompt(request),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.url(&request.model))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                400 if text.contains("API_KEY_INVALID") => AiError::AuthenticationFailed,
                401 | 403 => AiError::AuthenticationFailed,
                429 => AiError::RateLimited {
                    retry_after_ms: None,
                },
                _ => AiError::Provider(format!("status {status}")),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|err| AiError::MalformedResponse(err.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| AiError::MalformedResponse("empty candidate".to_string()))
    }
}
