//! In-memory bot-config repository.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use chatflow_core::repository::BotConfigRepository;
use chatflow_types::bot::{BotConfig, BotId};
use chatflow_types::error::RepositoryError;

/// DashMap-backed [`BotConfigRepository`], keyed by bot id.
#[derive(Default)]
pub struct InMemoryBotRepository {
    bots: DashMap<BotId, BotConfig>,
}

impl InMemoryBotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_for_session(&self, owner_id: &str, session_id: &str) -> Option<BotConfig> {
        self.bots
            .iter()
            .find(|entry| {
                entry.value().owner_id == owner_id && entry.value().session_id == session_id
            })
            .map(|entry| entry.value().clone())
    }
}

impl BotConfigRepository for InMemoryBotRepository {
    async fn get_active_for_session(
        &self,
        owner_id: &str,
        session_id: &str,
    ) -> Result<Option<BotConfig>, RepositoryError> {
        Ok(self
            .find_for_session(owner_id, session_id)
            .filter(|bot| bot.is_active))
    }

    async fn upsert(&self, config: &BotConfig) -> Result<BotConfig, RepositoryError> {
        let mut stored = config.clone();
        if let Some(existing) = self.find_for_session(&config.owner_id, &config.session_id) {
            stored.id = existing.id;
            stored.created_at = existing.created_at;
        }
        stored.updated_at = Utc::now();
        self.bots.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update(&self, config: &BotConfig) -> Result<(), RepositoryError> {
        if !self.bots.contains_key(&config.id) {
            return Err(RepositoryError::NotFound);
        }
        self.bots.insert(config.id.clone(), config.clone());
        Ok(())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<BotConfig>, RepositoryError> {
        let mut bots: Vec<BotConfig> = self
            .bots
            .iter()
            .filter(|entry| entry.value().owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect();
        bots.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(bots)
    }

    async fn delete(&self, id: &BotId) -> Result<(), RepositoryError> {
        self.bots
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn set_active(&self, id: &BotId, active: bool) -> Result<(), RepositoryError> {
        let mut bot = self.bots.get_mut(id).ok_or(RepositoryError::NotFound)?;
        bot.is_active = active;
        bot.updated_at = Utc::now();
        Ok(())
    }

    async fn record_usage(
        &self,
        id: &BotId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut bot = self.bots.get_mut(id).ok_or(RepositoryError::NotFound)?;
        bot.analytics.total_messages += 1;
        bot.analytics.last_used = Some(at);
        Ok(())
    }
}
