//! In-memory conversation store.
//!
//! DashMap-sharded per-chat deques, capped at
//! [`MAX_MEMORY_ENTRIES`](chatflow_core::memory::MAX_MEMORY_ENTRIES) with
//! FIFO eviction. Held only in process memory -- lost on restart,
//! intentionally.

use std::collections::VecDeque;

use dashmap::DashMap;

use chatflow_core::memory::{ConversationStore, MAX_MEMORY_ENTRIES};
use chatflow_types::memory::MemoryEntry;

/// Process-memory [`ConversationStore`] keyed by chat id.
#[derive(Default)]
pub struct InMemoryConversationStore {
    chats: DashMap<String, VecDeque<MemoryEntry>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chats currently holding memory.
    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }
}

impl ConversationStore for InMemoryConversationStore {
    async fn recent(&self, chat_id: &str) -> Vec<MemoryEntry> {
        self.chats
            .get(chat_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn append(&self, chat_id: &str, entry: MemoryEntry) {
        let mut entries = self.chats.entry(chat_id.to_string()).or_default();
        entries.push_back(entry);
        while entries.len() > MAX_MEMORY_ENTRIES {
            entries.pop_front();
        }
    }

    async fn clear(&self, chat_id: &str) {
        self.chats.remove(chat_id);
    }
}
