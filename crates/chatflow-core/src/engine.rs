//! Mode orchestrator: the top-level state machine per inbound message.
//!
//! Sequences gating -> (trigger matcher -> flow executor) and/or AI
//! responder -> fallback, according to the bot's configured mode. Returns
//! a boolean "handled" signal: true whenever any response (flow, AI, or
//! fallback) was sent. Missing configs and gating rejections are silent
//! no-ops, not errors.
//!
//! Messages for different chats run fully concurrently; messages for the
//! same chat are serialized through a per-chat mutex held for the whole
//! processing call, so inter-step delays and AI calls for one message
//! finish before the next message for that chat begins.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use chatflow_types::bot::{AiMode, BotConfig};
use chatflow_types::error::EngineError;
use chatflow_types::message::InboundMessage;

use crate::executor::{self, ExecutionContext};
use crate::memory::ConversationStore;
use crate::provider::ProviderFactory;
use crate::repository::BotConfigRepository;
use crate::{analytics, gating, matcher, responder, template};
use crate::transport::Transport;

/// The decision-and-execution engine. One instance serves all tenants.
///
/// Generic over its collaborator traits so tests and the admin harness
/// can inject doubles; concrete wiring lives in chatflow-infra and the
/// CLI.
pub struct Engine<R, T, M, P> {
    repo: Arc<R>,
    transport: Arc<T>,
    memory: Arc<M>,
    providers: Arc<P>,
    /// Per-chat serialization locks, keyed by "session:chat". Entries
    /// are evicted once no in-flight message holds them, so the map
    /// tracks active chats rather than every chat ever seen.
    chat_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<R, T, M, P> Engine<R, T, M, P>
where
    R: BotConfigRepository,
    T: Transport,
    M: ConversationStore,
    P: ProviderFactory,
{
    pub fn new(repo: Arc<R>, transport: Arc<T>, memory: Arc<M>, providers: Arc<P>) -> Self {
        Self {
            repo,
            transport,
            memory,
            providers,
            chat_locks: DashMap::new(),
        }
    }

    /// Process one inbound message to completion.
    ///
    /// This is also the synchronous test entry point: the admin harness
    /// awaits it directly with a recording transport. Returns whether any
    /// response was sent.
    pub async fn process_message(&self, inbound: &InboundMessage) -> Result<bool, EngineError> {
        let bot = self
            .repo
            .get_active_for_session(&inbound.owner_id, &inbound.session_id)
            .await?;
        let Some(bot) = bot else {
            tracing::debug!(
                owner_id = %inbound.owner_id,
                session_id = %inbound.session_id,
                "no active bot for session"
            );
            return Ok(false);
        };

        let key = format!("{}:{}", inbound.session_id, inbound.chat_id);
        let lock = self.chat_lock(&key);
        let result = {
            let _guard = lock.lock().await;
            self.handle(&bot, inbound).await
        };
        drop(lock);
        // Only the map's own Arc left means no other message for this
        // chat is in flight or waiting; the entry can go.
        self.chat_locks
            .remove_if(&key, |_, entry| Arc::strong_count(entry) == 1);
        result
    }

    /// Gating and mode dispatch, run under the chat lock.
    async fn handle(&self, bot: &BotConfig, inbound: &InboundMessage) -> Result<bool, EngineError> {
        if !gating::allows(&bot.settings, inbound.is_group, Utc::now()) {
            return Ok(false);
        }

        let text = inbound.normalized_body();
        let mode = if bot.ai.enabled {
            bot.ai.mode
        } else {
            AiMode::FlowsOnly
        };

        match mode {
            AiMode::FlowsOnly => match matcher::match_flow(bot, text) {
                Some(flow) => {
                    self.run_flow(bot, flow, inbound).await?;
                    Ok(true)
                }
                None => self.send_fallback(bot, inbound).await,
            },
            AiMode::AiOnly => self.answer_with_ai(bot, inbound).await,
            AiMode::Hybrid => match matcher::match_flow(bot, text) {
                // Flows take precedence over AI.
                Some(flow) => {
                    self.run_flow(bot, flow, inbound).await?;
                    Ok(true)
                }
                None => self.answer_with_ai(bot, inbound).await,
            },
        }
    }

    /// Execute a matched flow chain and record analytics.
    async fn run_flow(
        &self,
        bot: &BotConfig,
        flow: &chatflow_types::flow::Flow,
        inbound: &InboundMessage,
    ) -> Result<(), EngineError> {
        let ctx = ExecutionContext {
            session_id: &inbound.session_id,
            chat_id: &inbound.chat_id,
            contact_name: inbound.contact_name.as_deref(),
        };
        executor::execute_chain(self.transport.as_ref(), bot, flow, &ctx).await?;
        analytics::record_usage(self.repo.as_ref(), &bot.id).await;
        Ok(())
    }

    /// Ask the AI responder; fall back to the static message on failure.
    async fn answer_with_ai(
        &self,
        bot: &BotConfig,
        inbound: &InboundMessage,
    ) -> Result<bool, EngineError> {
        let answer = match self.providers.provider_for(&bot.ai) {
            Some(provider) => {
                responder::respond(
                    &provider,
                    self.memory.as_ref(),
                    &bot.ai,
                    &inbound.chat_id,
                    inbound.normalized_body(),
                )
                .await
            }
            None => {
                tracing::warn!(
                    bot_id = %bot.id,
                    provider = %bot.ai.provider,
                    "no usable ai provider for bot"
                );
                None
            }
        };

        match answer {
            Some(text) => {
                self.transport
                    .send_text(&inbound.session_id, &inbound.chat_id, &text)
                    .await
                    .map_err(EngineError::from)?;
                analytics::record_usage(self.repo.as_ref(), &bot.id).await;
                Ok(true)
            }
            None => self.send_fallback(&bot, inbound).await,
        }
    }

    /// Send the configured fallback message, if any. Fallback sends count
    /// as handled but are deliberately not recorded in analytics.
    async fn send_fallback(
        &self,
        bot: &BotConfig,
        inbound: &InboundMessage,
    ) -> Result<bool, EngineError> {
        let fallback = bot
            .settings
            .fallback_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());
        let Some(fallback) = fallback else {
            return Ok(false);
        };

        // Same bot-local clock as flow steps, so `{time}`/`{day}` agree.
        let text = template::render(
            fallback,
            inbound.contact_name.as_deref(),
            &executor::bot_local_now(bot),
        );
        self.transport
            .send_text(&inbound.session_id, &inbound.chat_id, &text)
            .await
            .map_err(EngineError::from)?;
        Ok(true)
    }

    /// The serialization lock for one chat, created on first use.
    fn chat_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.chat_locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
