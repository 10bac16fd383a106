//! Best-effort analytics recording.
//!
//! Usage counters are nice-to-have: a repository failure here is logged
//! and swallowed, it must never abort message handling. Called on the
//! flow-match and AI-success paths only; fallback-only sends are not
//! counted (they represent a miss, not an answered message).

use chrono::Utc;

use chatflow_types::bot::BotId;

use crate::repository::BotConfigRepository;

/// Bump `total_messages` and `last_used` for a bot, swallowing failures.
pub async fn record_usage<R: BotConfigRepository>(repo: &R, bot_id: &BotId) {
    if let Err(err) = repo.record_usage(bot_id, Utc::now()).await {
        tracing::warn!(bot_id = %bot_id, error = %err, "analytics update failed, ignoring");
    }
}
