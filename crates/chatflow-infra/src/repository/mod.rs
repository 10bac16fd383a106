//! Bot-config repository implementations.
//!
//! The in-memory repository backs tests and the admin harness; the SQLite
//! repository backs deployments that want a process-local store. Both
//! implement [`BotConfigRepository`](chatflow_core::repository::BotConfigRepository)
//! with the same upsert semantics: keyed by (owner, session), preserving
//! id and created_at on replace.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryBotRepository;
pub use sqlite::SqliteBotConfigRepository;
