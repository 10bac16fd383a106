//! Static session directory for offline reconciliation.
//!
//! Deployments plug the live chat-session collaborator in behind
//! [`SessionDirectory`]; the harness reconciles against an explicit list
//! of surviving session ids instead.

use std::collections::HashSet;

use chatflow_core::reconcile::SessionDirectory;

/// [`SessionDirectory`] backed by a fixed set of surviving session ids.
pub struct StaticSessionDirectory {
    sessions: HashSet<String>,
}

impl StaticSessionDirectory {
    pub fn new(sessions: impl IntoIterator<Item = String>) -> Self {
        Self {
            sessions: sessions.into_iter().collect(),
        }
    }
}

impl SessionDirectory for StaticSessionDirectory {
    async fn session_exists(&self, _owner_id: &str, session_id: &str) -> bool {
        self.sessions.contains(session_id)
    }

    async fn find_session_for_owner(&self, _owner_id: &str) -> Option<String> {
        // Any surviving session is a valid repair target.
        self.sessions.iter().min().cloned()
    }
}
