//! The chatflow decision-and-execution engine.
//!
//! Given an inbound chat message for a configured bot, decide whether and
//! how to respond: gating policy, trigger matching, flow-chain execution,
//! generative-AI fallback, bounded conversation memory, and best-effort
//! analytics. Everything external (message transport, AI provider, config
//! persistence, session directory) sits behind traits; concrete adapters
//! live in chatflow-infra.

pub mod analytics;
pub mod box_provider;
pub mod engine;
pub mod executor;
pub mod gating;
pub mod matcher;
pub mod memory;
pub mod provider;
pub mod reconcile;
pub mod repository;
pub mod responder;
pub mod template;
pub mod transport;
