//! Inbound message event consumed by the engine.

use serde::{Deserialize, Serialize};

/// One inbound chat message, as delivered by the transport collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Tenant the message belongs to.
    pub owner_id: String,
    /// Chat-session the message arrived on.
    pub session_id: String,
    /// Conversation identifier within the session.
    pub chat_id: String,
    /// Raw message text.
    pub body: String,
    /// True when the message came from a group chat.
    #[serde(default)]
    pub is_group: bool,
    /// Display name of the sender, when the transport knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
}

impl InboundMessage {
    /// Message text trimmed of surrounding whitespace, as fed to the
    /// trigger matcher.
    pub fn normalized_body(&self) -> &str {
        self.body.trim()
    }
}
