//! Harness configuration and bot-definition loading.
//!
//! Two inputs with different strictness:
//!
//! - `chatflow.toml` harness defaults: missing or malformed files log a
//!   warning and fall back to [`HarnessConfig::default()`].
//! - Bot definition files: parse and validation errors are hard failures,
//!   since replaying against a half-loaded fleet would be misleading.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use chatflow_types::bot::{AiConfig, BotConfig, Settings};
use chatflow_types::flow::Flow;

/// Harness-level defaults, loaded from `chatflow.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
    /// Owner used when `--owner` is omitted.
    #[serde(default)]
    pub default_owner: Option<String>,
    /// Session used when `--session` is omitted.
    #[serde(default)]
    pub default_session: Option<String>,
}

/// Load harness defaults from `path`.
///
/// - If the file does not exist, returns [`HarnessConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns
///   the default.
pub async fn load_harness_config(path: &Path) -> HarnessConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {} found, using defaults", path.display());
            return HarnessConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return HarnessConfig::default();
        }
    };

    match toml::from_str::<HarnessConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            HarnessConfig::default()
        }
    }
}

/// One bot as written in a definition file. Identity and analytics fields
/// are harness-assigned, so the file only carries the configurable parts.
#[derive(Debug, Clone, Deserialize)]
pub struct BotDefinition {
    pub owner_id: String,
    pub session_id: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub flows: Vec<Flow>,
    #[serde(default)]
    pub default_flow: Option<Flow>,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub settings: Settings,
}

fn default_active() -> bool {
    true
}

impl BotDefinition {
    pub fn into_config(self) -> BotConfig {
        let mut bot = BotConfig::new(self.owner_id, self.session_id);
        bot.is_active = self.is_active;
        bot.flows = self.flows;
        bot.default_flow = self.default_flow;
        bot.ai = self.ai;
        bot.settings = self.settings;
        bot
    }
}

#[derive(Debug, Deserialize)]
struct BotFile {
    #[serde(default, rename = "bot")]
    bots: Vec<BotDefinition>,
}

/// Load and validate every `[[bot]]` definition in `path`.
pub async fn load_bot_definitions(path: &Path) -> anyhow::Result<Vec<BotConfig>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: BotFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let bots: Vec<BotConfig> = file
        .bots
        .into_iter()
        .map(BotDefinition::into_config)
        .collect();
    for bot in &bots {
        bot.validate().with_context(|| {
            format!(
                "invalid bot definition for owner '{}', session '{}'",
                bot.owner_id, bot.session_id
            )
        })?;
    }
    Ok(bots)
}
