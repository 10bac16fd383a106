//! Out-of-band reconciliation of orphaned bot configs.
//!
//! A bot config references a chat-session by id; sessions are owned by an
//! external collaborator and can disappear. This job repairs configs
//! whose session reference no longer resolves (when the directory knows a
//! surviving session for the owner) or soft-deactivates them. It runs
//! outside the hot message-processing path, on a schedule or on demand --
//! never per message.

use chatflow_types::error::RepositoryError;

use crate::repository::BotConfigRepository;

/// Read-only view of the session collaborator, consumed by the reconciler.
pub trait SessionDirectory: Send + Sync {
    /// Whether the referenced session still exists for this owner.
    fn session_exists(
        &self,
        owner_id: &str,
        session_id: &str,
    ) -> impl std::future::Future<Output = bool> + Send;

    /// A surviving session for the owner that an orphaned config can be
    /// re-pointed at, if any.
    fn find_session_for_owner(
        &self,
        owner_id: &str,
    ) -> impl std::future::Future<Output = Option<String>> + Send;
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub repaired: usize,
    pub deactivated: usize,
}

/// Reconcile every config belonging to `owner_id`.
///
/// Orphans are repaired in place when the directory offers a replacement
/// session, otherwise soft-deactivated (never deleted).
pub async fn reconcile<R, D>(
    repo: &R,
    directory: &D,
    owner_id: &str,
) -> Result<ReconcileReport, RepositoryError>
where
    R: BotConfigRepository,
    D: SessionDirectory,
{
    let mut report = ReconcileReport::default();

    for mut bot in repo.list(owner_id).await? {
        report.scanned += 1;

        if directory.session_exists(owner_id, &bot.session_id).await {
            continue;
        }

        match directory.find_session_for_owner(owner_id).await {
            Some(new_session) => {
                tracing::info!(
                    bot_id = %bot.id,
                    old_session = %bot.session_id,
                    new_session = %new_session,
                    "repairing orphaned bot config"
                );
                bot.session_id = new_session;
                bot.updated_at = chrono::Utc::now();
                repo.update(&bot).await?;
                report.repaired += 1;
            }
            None => {
                tracing::info!(bot_id = %bot.id, "deactivating orphaned bot config");
                repo.set_active(&bot.id, false).await?;
                report.deactivated += 1;
            }
        }
    }

    Ok(report)
}
