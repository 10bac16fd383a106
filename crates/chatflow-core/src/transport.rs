//! Outbound message transport seam.
//!
//! The real chat-transport protocol is an external collaborator; the
//! engine only needs these two dispatch operations. Infra ships a
//! recording implementation for tests and the admin harness.

use chatflow_types::error::TransportError;

/// Outbound dispatch interface consumed by the flow executor and the
/// orchestrator.
pub trait Transport: Send + Sync {
    /// Deliver plain text to a chat.
    fn send_text(
        &self,
        session_id: &str,
        chat_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Deliver media fetched from a URL, with a caption.
    fn send_media_from_url(
        &self,
        session_id: &str,
        chat_id: &str,
        url: &str,
        caption: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}
