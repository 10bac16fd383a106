//! Chatflow admin harness entry point.
//!
//! Binary name: `chatflow`
//!
//! Loads bot definitions from TOML, replays inbound messages against them
//! through the real engine with a recording transport, and reports what
//! would have been delivered. Also validates definitions and reconciles
//! configs against a list of surviving sessions.

mod cli;
mod config;
mod directory;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use chatflow_core::engine::Engine;
use chatflow_core::reconcile;
use chatflow_core::repository::BotConfigRepository;
use chatflow_infra::llm::ProviderSelector;
use chatflow_infra::memory::InMemoryConversationStore;
use chatflow_infra::repository::InMemoryBotRepository;
use chatflow_infra::transport::{Outbound, RecordingTransport};
use chatflow_types::message::InboundMessage;

use cli::{Cli, Commands};
use config::HarnessConfig;
use directory::StaticSessionDirectory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    chatflow_observe::tracing_setup::init_tracing(cli.otel)
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("chatflow.toml"));
    let defaults = config::load_harness_config(&config_path).await;

    let result = run(cli, defaults).await;
    chatflow_observe::tracing_setup::shutdown_tracing();
    result
}

async fn run(cli: Cli, defaults: HarnessConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Validate { file } => {
            let bots = config::load_bot_definitions(&file).await?;
            if cli.json {
                let report: Vec<_> = bots
                    .iter()
                    .map(|bot| {
                        serde_json::json!({
                            "owner_id": bot.owner_id,
                            "session_id": bot.session_id,
                            "flows": bot.flows.len(),
                            "ai_enabled": bot.ai.enabled,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for bot in &bots {
                    println!(
                        "ok: {}/{} ({} flows, ai {})",
                        bot.owner_id,
                        bot.session_id,
                        bot.flows.len(),
                        if bot.ai.enabled { "on" } else { "off" }
                    );
                }
                println!("{} definition(s) valid", bots.len());
            }
        }

        Commands::Send {
            bots,
            owner,
            session,
            chat,
            from,
            group,
            message,
        } => {
            let owner = owner
                .or(defaults.default_owner)
                .context("no owner given (use --owner or set default_owner)")?;
            let session = session
                .or(defaults.default_session)
                .context("no session given (use --session or set default_session)")?;

            let repo = Arc::new(load_fleet(&bots).await?);
            let transport = Arc::new(RecordingTransport::new());
            let memory = Arc::new(InMemoryConversationStore::new());
            let providers = Arc::new(ProviderSelector::from_env());
            let engine = Engine::new(repo, transport.clone(), memory, providers);

            let inbound = InboundMessage {
                owner_id: owner,
                session_id: session,
                chat_id: chat,
                body: message,
                is_group: group,
                contact_name: from,
            };
            let handled = engine.process_message(&inbound).await?;

            let sent = transport.sent();
            if cli.json {
                let dispatches: Vec<_> = sent.iter().map(outbound_json).collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "handled": handled,
                        "sent": dispatches,
                    }))?
                );
            } else {
                for outbound in &sent {
                    match outbound {
                        Outbound::Text { chat_id, text, .. } => {
                            println!("-> [{chat_id}] {text}");
                        }
                        Outbound::Media {
                            chat_id,
                            url,
                            caption,
                            ..
                        } => {
                            println!("-> [{chat_id}] media {url} ({caption})");
                        }
                    }
                }
                println!(
                    "{}",
                    if handled { "handled" } else { "not handled" }
                );
            }
        }

        Commands::Reconcile {
            bots,
            owner,
            sessions,
        } => {
            let owner = owner
                .or(defaults.default_owner)
                .context("no owner given (use --owner or set default_owner)")?;

            let repo = load_fleet(&bots).await?;
            let directory = StaticSessionDirectory::new(sessions);
            let report = reconcile::reconcile(&repo, &directory, &owner).await?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "scanned": report.scanned,
                        "repaired": report.repaired,
                        "deactivated": report.deactivated,
                    }))?
                );
            } else {
                println!(
                    "scanned {}, repaired {}, deactivated {}",
                    report.scanned, report.repaired, report.deactivated
                );
            }
        }
    }

    Ok(())
}

/// Load a definition file into a fresh in-memory repository.
async fn load_fleet(path: &std::path::Path) -> anyhow::Result<InMemoryBotRepository> {
    let repo = InMemoryBotRepository::new();
    for bot in config::load_bot_definitions(path).await? {
        repo.upsert(&bot).await?;
    }
    Ok(repo)
}

fn outbound_json(outbound: &Outbound) -> serde_json::Value {
    match outbound {
        Outbound::Text {
            session_id,
            chat_id,
            text,
        } => serde_json::json!({
            "kind": "text",
            "session_id": session_id,
            "chat_id": chat_id,
            "text": text,
        }),
        Outbound::Media {
            session_id,
            chat_id,
            url,
            caption,
        } => serde_json::json!({
            "kind": "media",
            "session_id": session_id,
            "chat_id": chat_id,
            "url": url,
            "caption": caption,
        }),
    }
}
