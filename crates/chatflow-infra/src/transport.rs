//! Recording transport.
//!
//! Captures outbound dispatches instead of delivering them. Used by the
//! admin harness ("what would this bot have sent?") and by tests. The
//! real chat transport is an external collaborator behind the same trait.

use std::sync::Mutex;

use chatflow_core::transport::Transport;
use chatflow_types::error::TransportError;

/// One captured outbound dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text {
        session_id: String,
        chat_id: String,
        text: String,
    },
    Media {
        session_id: String,
        chat_id: String,
        url: String,
        caption: String,
    },
}

/// [`Transport`] that records every dispatch in order.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Outbound>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything dispatched so far, in order.
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().expect("recording transport poisoned").clone()
    }

    /// Drop all recorded dispatches.
    pub fn reset(&self) {
        self.sent.lock().expect("recording transport poisoned").clear();
    }
}

impl Transport for RecordingTransport {
    async fn send_text(
        &self,
        session_id: &str,
        chat_id: &str,
        text: &str,
    ) -> Result<(), TransportError> {
        self.sent
            .lock()
            .expect("recording transport poisoned")
            .push(Outbound::Text {
                session_id: session_id.to_string(),
                chat_id: chat_id.to_string(),
                text: text.to_string(),
            });
        Ok(())
    }

    async fn send_media_from_url(
        &self,
        session_id: &str,
        chat_id: &str,
        url: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        self.sent
            .lock()
            .expect("recording transport poisoned")
            .push(Outbound::Media {
                session_id: session_id.to_string(),
                chat_id: chat_id.to_string(),
                url: url.to_string(),
                caption: caption.to_string(),
            });
        Ok(())
    }
}
