//! Concrete adapters for the chatflow engine.
//!
//! Implements the trait seams defined in chatflow-core: generative AI
//! providers (OpenAI chat-style and Gemini completion-style), the bounded
//! in-memory conversation store, in-memory and SQLite bot-config
//! repositories, and the recording transport used by tests and the admin
//! harness.

pub mod llm;
pub mod memory;
pub mod repository;
pub mod transport;
