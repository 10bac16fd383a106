//! Bot configuration types.
//!
//! A [`BotConfig`] is the unit of tenancy: one per (owner, chat-session)
//! pair. It carries the ordered flow list, the AI configuration, gating
//! settings, and usage analytics. The engine treats it as read-only during
//! message handling; all mutation goes through the repository.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::flow::Flow;

/// Unique identifier for a bot config, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotId(pub Uuid);

impl BotId {
    /// Create a new BotId using UUID v7 (time-sortable, guaranteed ordering).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a BotId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for BotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// How the orchestrator combines deterministic flows and generative AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiMode {
    /// Only flow matching; no AI call ever.
    FlowsOnly,
    /// Skip matching; every message goes to the AI responder.
    AiOnly,
    /// Flows take precedence; AI answers what no flow matched.
    Hybrid,
}

impl Default for AiMode {
    fn default() -> Self {
        AiMode::FlowsOnly
    }
}

impl fmt::Display for AiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiMode::FlowsOnly => write!(f, "flows_only"),
            AiMode::AiOnly => write!(f, "ai_only"),
            AiMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for AiMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "flows_only" => Ok(AiMode::FlowsOnly),
            "ai_only" => Ok(AiMode::AiOnly),
            "hybrid" => Ok(AiMode::Hybrid),
            other => Err(format!("invalid ai mode: '{other}'")),
        }
    }
}

/// Generative provider backend selected per bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderKind {
    /// Multi-turn chat-completions API.
    OpenAi,
    /// Single-prompt completion-style API.
    Gemini,
}

impl fmt::Display for AiProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiProviderKind::OpenAi => write!(f, "openai"),
            AiProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for AiProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(AiProviderKind::OpenAi),
            "gemini" => Ok(AiProviderKind::Gemini),
            other => Err(format!("invalid ai provider: '{other}'")),
        }
    }
}

/// Per-bot generative AI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: AiMode,
    pub provider: AiProviderKind,
    pub model: String,
    /// Per-bot API key; falls back to the process-wide key when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Short description of what this bot is for, folded into the system
    /// instruction ("You are a helpful assistant for {purpose}.").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    /// Full system-prompt override appended after the purpose sentence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: AiMode::FlowsOnly,
            provider: AiProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            purpose: None,
            system_prompt: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Working-hours window in the bot's local timezone.
///
/// `days` uses weekday numbers 0 = Sunday .. 6 = Saturday. The window is
/// inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    #[serde(default)]
    pub enabled: bool,
    /// IANA timezone name (e.g. "America/Sao_Paulo"). Unknown names fall
    /// back to UTC at evaluation time.
    pub timezone: String,
    /// Window start, "HH:MM".
    pub start: String,
    /// Window end, "HH:MM".
    pub end: String,
    pub days: Vec<u8>,
}

impl WorkingHours {
    /// Parse the configured window into `NaiveTime`s.
    pub fn window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        let start = parse_hhmm(&self.start)?;
        let end = parse_hhmm(&self.end)?;
        Ok((start, end))
    }
}

fn parse_hhmm(s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| ConfigError::InvalidTime(s.to_string()))
}

/// Gating and fallback settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Respond inside group chats.
    #[serde(default)]
    pub enable_in_groups: bool,
    /// Respond to contacts the owner has never messaged before.
    #[serde(default)]
    pub enable_for_unknown: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingHours>,
    /// Static text (template) sent when neither a flow nor AI produced a
    /// response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_message: Option<String>,
}

/// Best-effort usage counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analytics {
    pub total_conversations: i64,
    pub total_messages: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

/// A configured bot: one per (owner, chat-session) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub id: BotId,
    /// Tenant that owns this bot.
    pub owner_id: String,
    /// Chat-session this bot answers for. May dangle if the session is
    /// removed; the reconciler repairs or deactivates such orphans.
    pub session_id: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Ordered flow list; order is the matching priority.
    #[serde(default)]
    pub flows: Vec<Flow>,
    /// Answers when no flow trigger matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_flow: Option<Flow>,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub analytics: Analytics,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl BotConfig {
    /// Create a new bot config with defaults for (owner, session).
    pub fn new(owner_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BotId::new(),
            owner_id: owner_id.into(),
            session_id: session_id.into(),
            is_active: true,
            flows: Vec::new(),
            default_flow: None,
            ai: AiConfig::default(),
            settings: Settings::default(),
            analytics: Analytics::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate the whole config before save.
    ///
    /// Checks flow-id uniqueness, each flow in isolation, working-hours
    /// times, and the temperature range. Dangling `next_flow_id` pointers
    /// are deliberately NOT rejected -- the executor treats them as chain
    /// terminators.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for flow in self.flows.iter().chain(self.default_flow.iter()) {
            flow.validate()?;
            if !seen.insert(flow.id.as_str()) {
                return Err(ConfigError::DuplicateFlowId(flow.id.clone()));
            }
        }
        if let Some(hours) = &self.settings.working_hours {
            hours.window()?;
            if let Some(day) = hours.days.iter().find(|d| **d > 6) {
                return Err(ConfigError::InvalidWeekday(*day));
            }
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(ConfigError::InvalidTemperature(self.ai.temperature));
        }
        Ok(())
    }

    /// Look up a flow by id, active or not.
    pub fn flow_by_id(&self, id: &str) -> Option<&Flow> {
        self.flows.iter().find(|f| f.id == id)
    }
}
