use thiserror::Error;

/// Errors from the generative AI provider call.
///
/// All variants are absorbed inside the AI responder -- they never reach
/// the orchestrator, which only sees "no AI response".
#[derive(Debug, Error)]
pub enum AiError {
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider error: {0}")]
    Provider(String),
}

/// Errors from the outbound message transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("dispatch timed out after {0}ms")]
    Timeout(u64),

    #[error("invalid media url: {0}")]
    InvalidMedia(String),
}

/// Errors from bot-config repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Bot-config validation errors, raised at save time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("duplicate flow id: '{0}'")]
    DuplicateFlowId(String),

    #[error("invalid flow '{flow_id}': {reason}")]
    InvalidFlow { flow_id: String, reason: String },

    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("invalid weekday {0}, expected 0-6")]
    InvalidWeekday(u8),

    #[error("temperature {0} outside 0.0-2.0")]
    InvalidTemperature(f64),
}

/// Errors surfaced by `process_message`.
///
/// Missing configs and gating rejections are NOT errors -- they are
/// silent no-ops reported as `Ok(false)`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
