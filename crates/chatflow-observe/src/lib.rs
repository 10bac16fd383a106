//! Observability: tracing subscriber setup and OpenTelemetry attribute
//! conventions shared across the workspace.

pub mod genai_attrs;
pub mod tracing_setup;
