//! Shared domain types for chatflow.
//!
//! This crate contains the core domain types used across the chatflow
//! engine: BotConfig, Flow, Trigger, ResponseStep, InboundMessage, and
//! their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod bot;
pub mod error;
pub mod flow;
pub mod memory;
pub mod message;
