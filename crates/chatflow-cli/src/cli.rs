//! CLI argument definitions for the `chatflow` binary.
//!
//! Uses clap derive macros. The harness replays messages against bot
//! definitions loaded from TOML and prints what a real transport would
//! have delivered.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Admin harness for conversational bot configs.
#[derive(Parser)]
#[command(name = "chatflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of plain text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Harness config file (defaults to ./chatflow.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Export spans through the OpenTelemetry stdout exporter.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate bot definitions without running them.
    Validate {
        /// TOML file with [[bot]] definitions.
        file: PathBuf,
    },

    /// Replay one inbound message and print what would have been sent.
    Send {
        /// TOML file with [[bot]] definitions.
        #[arg(long)]
        bots: PathBuf,

        /// Owner (tenant) the message belongs to.
        #[arg(long)]
        owner: Option<String>,

        /// Chat-session the message arrived on.
        #[arg(long)]
        session: Option<String>,

        /// Chat (conversation) id within the session.
        #[arg(long, default_value = "chat-1")]
        chat: String,

        /// Contact display name, used for {name} templating.
        #[arg(long)]
        from: Option<String>,

        /// Treat the message as coming from a group chat.
        #[arg(long)]
        group: bool,

        /// The message body.
        message: String,
    },

    /// Repair or deactivate bot configs whose session no longer exists.
    Reconcile {
        /// TOML file with [[bot]] definitions.
        #[arg(long)]
        bots: PathBuf,

        /// Owner whose configs to reconcile.
        #[arg(long)]
        owner: Option<String>,

        /// Surviving session id (repeatable).
        #[arg(long = "session", value_name = "ID")]
        sessions: Vec<String>,
    },
}
