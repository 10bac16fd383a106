//! Conversation-memory entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One remembered exchange: what the user asked and what the AI answered.
///
/// Held in process memory only, capped per chat with FIFO eviction.
/// Loss on restart is intentional (cost/latency tradeoff).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    /// Create an entry timestamped "now".
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}
