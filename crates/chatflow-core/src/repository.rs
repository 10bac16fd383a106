//! Bot-config repository trait definition.
//!
//! Persistence of bot configs is owned by an external collaborator; the
//! engine consumes this interface. Implementations live in chatflow-infra
//! (in-memory for tests/harness, SQLite for deployments that want one
//! process-local store).

use chrono::{DateTime, Utc};

use chatflow_types::bot::{BotConfig, BotId};
use chatflow_types::error::RepositoryError;

/// Repository for bot-config persistence.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait
/// macro).
pub trait BotConfigRepository: Send + Sync {
    /// The active bot answering for (owner, session), if any.
    ///
    /// This is the hot-path read: it must never attempt orphan repair
    /// (that belongs to [`crate::reconcile`]).
    fn get_active_for_session(
        &self,
        owner_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<BotConfig>, RepositoryError>> + Send;

    /// Idempotent upsert keyed by (owner, session).
    ///
    /// When a config already exists for the pair, its `id` and
    /// `created_at` are preserved and the rest is replaced; `updated_at`
    /// is bumped. Returns the stored config.
    fn upsert(
        &self,
        config: &BotConfig,
    ) -> impl std::future::Future<Output = Result<BotConfig, RepositoryError>> + Send;

    /// Replace an existing config keyed by id (used by the reconciler,
    /// which may change the session reference itself).
    fn update(
        &self,
        config: &BotConfig,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All configs for an owner, active or not.
    fn list(
        &self,
        owner_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<BotConfig>, RepositoryError>> + Send;

    /// Permanently delete a config.
    fn delete(
        &self,
        id: &BotId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Soft-activate or soft-deactivate a config.
    fn set_active(
        &self,
        id: &BotId,
        active: bool,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Best-effort usage bump: increment `total_messages` and set
    /// `last_used`. Called on the flow-match and AI-success paths only.
    fn record_usage(
        &self,
        id: &BotId,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
