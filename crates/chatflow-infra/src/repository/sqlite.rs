//! SQLite bot-config repository implementation.
//!
//! Implements `BotConfigRepository` from `chatflow-core` using sqlx.
//! Nested structures (flows, default flow, AI config, settings) are
//! stored as JSON text columns; timestamps as RFC 3339 strings.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use chatflow_core::repository::BotConfigRepository;
use chatflow_types::bot::{Analytics, BotConfig, BotId};
use chatflow_types::error::RepositoryError;

/// Open (and create if missing) a SQLite database at `url`
/// (e.g. `sqlite:chatflow.db` or `sqlite::memory:`).
pub async fn connect(url: &str) -> Result<SqlitePool, RepositoryError> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .create_if_missing(true);

    // A single connection keeps `sqlite::memory:` coherent; SQLite writes
    // are serialized anyway.
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|_| RepositoryError::Connection)
}

/// Create the bot_configs table and its (owner, session) uniqueness index.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bot_configs (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            flows TEXT NOT NULL,
            default_flow TEXT,
            ai TEXT NOT NULL,
            settings TEXT NOT NULL,
            total_conversations INTEGER NOT NULL DEFAULT 0,
            total_messages INTEGER NOT NULL DEFAULT 0,
            last_used TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(map_sqlx)?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_bot_configs_owner_session
         ON bot_configs (owner_id, session_id)",
    )
    .execute(pool)
    .await
    .map_err(map_sqlx)?;

    Ok(())
}

/// SQLite-backed implementation of `BotConfigRepository`.
pub struct SqliteBotConfigRepository {
    pool: SqlitePool,
}

impl SqliteBotConfigRepository {
    /// Create a new repository backed by the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain BotConfig.
struct BotConfigRow {
    id: String,
    owner_id: String,
    session_id: String,
    is_active: bool,
    flows: String,
    default_flow: Option<String>,
    ai: String,
    settings: String,
    total_conversations: i64,
    total_messages: i64,
    last_used: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BotConfigRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            session_id: row.try_get("session_id")?,
            is_active: row.try_get("is_active")?,
            flows: row.try_get("flows")?,
            default_flow: row.try_get("default_flow")?,
            ai: row.try_get("ai")?,
            settings: row.try_get("settings")?,
            total_conversations: row.try_get("total_conversations")?,
            total_messages: row.try_get("total_messages")?,
            last_used: row.try_get("last_used")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_config(self) -> Result<BotConfig, RepositoryError> {
        let id = self
            .id
            .parse::<BotId>()
            .map_err(|e| RepositoryError::Query(format!("invalid bot id: {e}")))?;

        let flows = serde_json::from_str(&self.flows)
            .map_err(|e| RepositoryError::Query(format!("invalid flows JSON: {e}")))?;
        let default_flow = self
            .default_flow
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid default flow JSON: {e}")))?;
        let ai = serde_json::from_str(&self.ai)
            .map_err(|e| RepositoryError::Query(format!("invalid ai JSON: {e}")))?;
        let settings = serde_json::from_str(&self.settings)
            .map_err(|e| RepositoryError::Query(format!("invalid settings JSON: {e}")))?;

        let created_at = parse_datetime(&self.created_at)?;
        let updated_at = parse_datetime(&self.updated_at)?;
        let last_used = self.last_used.as_deref().map(parse_datetime).transpose()?;

        Ok(BotConfig {
            id,
            owner_id: self.owner_id,
            session_id: self.session_id,
            is_active: self.is_active,
            flows,
            default_flow,
            ai,
            settings,
            analytics: Analytics {
                total_conversations: self.total_conversations,
                total_messages: self.total_messages,
                last_used,
            },
            created_at,
            updated_at,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn map_sqlx(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => RepositoryError::Connection,
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        other => RepositoryError::Query(other.to_string()),
    }
}

/// Serialize the JSON columns of a config.
fn json_columns(
    config: &BotConfig,
) -> Result<(String, Option<String>, String, String), RepositoryError> {
    let flows = serde_json::to_string(&config.flows)
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let default_flow = config
        .default_flow
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let ai =
        serde_json::to_string(&config.ai).map_err(|e| RepositoryError::Query(e.to_string()))?;
    let settings = serde_json::to_string(&config.settings)
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    Ok((flows, default_flow, ai, settings))
}

impl BotConfigRepository for SqliteBotConfigRepository {
    async fn get_active_for_session(
        &self,
        owner_id: &str,
        session_id: &str,
    ) -> Result<Option<BotConfig>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM bot_configs
             WHERE owner_id = ? AND session_id = ? AND is_active = 1",
        )
        .bind(owner_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.map(|r| BotConfigRow::from_row(&r).map_err(map_sqlx)?.into_config())
            .transpose()
    }

    async fn upsert(&self, config: &BotConfig) -> Result<BotConfig, RepositoryError> {
        let existing = sqlx::query(
            "SELECT id, created_at FROM bot_configs WHERE owner_id = ? AND session_id = ?",
        )
        .bind(&config.owner_id)
        .bind(&config.session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        // Same (owner, session) pair means the same logical bot: keep its
        // id and created_at, replace everything else.
        let mut stored = config.clone();
        let replacing = match existing {
            Some(row) => {
                let id: String = row.try_get("id").map_err(map_sqlx)?;
                let created_at: String = row.try_get("created_at").map_err(map_sqlx)?;
                stored.id = id
                    .parse()
                    .map_err(|e| RepositoryError::Query(format!("invalid bot id: {e}")))?;
                stored.created_at = parse_datetime(&created_at)?;
                true
            }
            None => false,
        };
        stored.updated_at = Utc::now();

        let (flows, default_flow, ai, settings) = json_columns(&stored)?;
        let query = if replacing {
            sqlx::query(
                "UPDATE bot_configs
                 SET is_active = ?, flows = ?, default_flow = ?, ai = ?, settings = ?,
                     total_conversations = ?, total_messages = ?, last_used = ?,
                     updated_at = ?
                 WHERE id = ?",
            )
            .bind(stored.is_active)
            .bind(&flows)
            .bind(&default_flow)
            .bind(&ai)
            .bind(&settings)
            .bind(stored.analytics.total_conversations)
            .bind(stored.analytics.total_messages)
            .bind(stored.analytics.last_used.as_ref().map(format_datetime))
            .bind(format_datetime(&stored.updated_at))
            .bind(stored.id.to_string())
        } else {
            sqlx::query(
                "INSERT INTO bot_configs (id, owner_id, session_id, is_active, flows,
                                          default_flow, ai, settings, total_conversations,
                                          total_messages, last_used, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(stored.id.to_string())
            .bind(&stored.owner_id)
            .bind(&stored.session_id)
            .bind(stored.is_active)
            .bind(&flows)
            .bind(&default_flow)
            .bind(&ai)
            .bind(&settings)
            .bind(stored.analytics.total_conversations)
            .bind(stored.analytics.total_messages)
            .bind(stored.analytics.last_used.as_ref().map(format_datetime))
            .bind(format_datetime(&stored.created_at))
            .bind(format_datetime(&stored.updated_at))
        };
        query.execute(&self.pool).await.map_err(map_sqlx)?;

        Ok(stored)
    }

    async fn update(&self, config: &BotConfig) -> Result<(), RepositoryError> {
        let (flows, default_flow, ai, settings) = json_columns(config)?;
        let result = sqlx::query(
            "UPDATE bot_configs
             SET owner_id = ?, session_id = ?, is_active = ?, flows = ?, default_flow = ?,
                 ai = ?, settings = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&config.owner_id)
        .bind(&config.session_id)
        .bind(config.is_active)
        .bind(&flows)
        .bind(&default_flow)
        .bind(&ai)
        .bind(&settings)
        .bind(format_datetime(&Utc::now()))
        .bind(config.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<BotConfig>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM bot_configs WHERE owner_id = ? ORDER BY created_at")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        rows.iter()
            .map(|r| BotConfigRow::from_row(r).map_err(map_sqlx)?.into_config())
            .collect()
    }

    async fn delete(&self, id: &BotId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM bot_configs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_active(&self, id: &BotId, active: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bot_configs SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(format_datetime(&Utc::now()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn record_usage(
        &self,
        id: &BotId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE bot_configs
             SET total_messages = total_messages + 1, last_used = ?
             WHERE id = ?",
        )
        .bind(format_datetime(&at))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_types::flow::{Flow, ResponseStep, Trigger};

    async fn repo() -> SqliteBotConfigRepository {
        let pool = connect("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        SqliteBotConfigRepository::new(pool)
    }

    fn bot_with_flow() -> BotConfig {
        let mut bot = BotConfig::new("owner", "session");
        bot.flows = vec![Flow {
            id: "greet".to_string(),
            name: "Greeting".to_string(),
            trigger: Trigger::Keyword {
                value: "hi".to_string(),
                case_sensitive: false,
            },
            steps: vec![ResponseStep::Text {
                content: "hello {name}".to_string(),
                delay_ms: 250,
            }],
            next_flow_id: None,
            is_active: true,
        }];
        bot
    }

    #[tokio::test]
    async fn test_upsert_and_fetch_roundtrip() {
        let repo = repo().await;
        let stored = repo.upsert(&bot_with_flow()).await.unwrap();

        let fetched = repo
            .get_active_for_session("owner", "session")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, stored.id);
        assert_eq!(fetched.flows.len(), 1);
        assert_eq!(fetched.flows[0].id, "greet");
        assert_eq!(fetched.flows[0].steps[0].delay_ms(), 250);
    }

    #[tokio::test]
    async fn test_upsert_preserves_identity_for_pair() {
        let repo = repo().await;
        let first = repo.upsert(&bot_with_flow()).await.unwrap();

        let mut replacement = BotConfig::new("owner", "session");
        replacement.settings.fallback_message = Some("later!".to_string());
        let second = repo.upsert(&replacement).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);

        let all = repo.list("owner").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(
            all[0].settings.fallback_message.as_deref(),
            Some("later!")
        );
    }

    #[tokio::test]
    async fn test_inactive_bot_not_returned() {
        let repo = repo().await;
        let bot = repo.upsert(&bot_with_flow()).await.unwrap();
        repo.set_active(&bot.id, false).await.unwrap();
        assert!(
            repo.get_active_for_session("owner", "session")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_record_usage_increments_and_timestamps() {
        let repo = repo().await;
        let bot = repo.upsert(&bot_with_flow()).await.unwrap();
        let at = Utc::now();
        repo.record_usage(&bot.id, at).await.unwrap();
        repo.record_usage(&bot.id, at).await.unwrap();

        let fetched = repo
            .get_active_for_session("owner", "session")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.analytics.total_messages, 2);
        assert!(fetched.analytics.last_used.is_some());
    }

    #[tokio::test]
    async fn test_update_reassigns_session() {
        let repo = repo().await;
        let mut bot = repo.upsert(&bot_with_flow()).await.unwrap();
        bot.session_id = "session-2".to_string();
        repo.update(&bot).await.unwrap();

        assert!(
            repo.get_active_for_session("owner", "session")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repo.get_active_for_session("owner", "session-2")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let repo = repo().await;
        assert!(matches!(
            repo.delete(&BotId::new()).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
