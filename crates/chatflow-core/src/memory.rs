//! Conversation-memory store trait.
//!
//! Bounded short-term history per chat, used to give the AI responder
//! continuity. The store is an explicit engine dependency (injected, not
//! a process global) so tests and multi-instance deployments can supply
//! their own. Implementations must be safe against concurrent
//! read/append/evict for the same chat.

use chatflow_types::memory::MemoryEntry;

/// Maximum remembered exchanges per chat; older entries are evicted FIFO.
pub const MAX_MEMORY_ENTRIES: usize = 5;

/// Per-chat bounded exchange history.
pub trait ConversationStore: Send + Sync {
    /// Recent entries for a chat, oldest first. At most
    /// [`MAX_MEMORY_ENTRIES`].
    fn recent(
        &self,
        chat_id: &str,
    ) -> impl std::future::Future<Output = Vec<MemoryEntry>> + Send;

    /// Append an exchange, evicting the oldest entry beyond the cap.
    fn append(
        &self,
        chat_id: &str,
        entry: MemoryEntry,
    ) -> impl std::future::Future<Output = ()> + Send;

    /// Drop all memory for a chat.
    fn clear(&self, chat_id: &str) -> impl std::future::Future<Output = ()> + Send;
}
