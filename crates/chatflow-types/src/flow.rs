//! Flow, trigger, and response-step types.
//!
//! A flow is a named rule: a trigger that selects it, an ordered list of
//! response steps, and an optional chain pointer to the next flow. Both
//! trigger and step kinds are closed tagged enums so the matcher and the
//! executor have to handle every kind exhaustively -- a new kind that is
//! not wired up fails to compile instead of silently doing nothing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// A deterministic response rule owned by a bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// Unique within the owning bot config.
    pub id: String,
    /// Freeform display name.
    pub name: String,
    /// Condition that selects this flow for an inbound message.
    pub trigger: Trigger,
    /// Ordered response steps executed on a match.
    pub steps: Vec<ResponseStep>,
    /// Chain pointer; a dangling reference terminates the chain, it is
    /// not an error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_flow_id: Option<String>,
    /// Inactive flows are skipped by the matcher and break chains.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Condition that selects a flow for an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trigger {
    /// Matches on equality or substring containment of the inbound text.
    Keyword {
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Matches only on exact equality (menu option replies like "2").
    Menu { value: String },
    /// Reserved for externally-fired flow entry points. Never matched
    /// against inbound message text.
    Webhook { value: String },
}

impl Trigger {
    /// The trigger's configured value, regardless of kind.
    pub fn value(&self) -> &str {
        match self {
            Trigger::Keyword { value, .. } => value,
            Trigger::Menu { value } => value,
            Trigger::Webhook { value } => value,
        }
    }
}

/// One unit of bot output within a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponseStep {
    /// Plain text message (content is a template, see the executor).
    Text {
        content: String,
        #[serde(default)]
        delay_ms: u64,
    },
    /// Media dispatched from a URL with the rendered content as caption.
    Media {
        kind: MediaKind,
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        media_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(default)]
        delay_ms: u64,
    },
    /// Rendered content followed by a numbered list of options.
    Menu {
        content: String,
        options: Vec<MenuOption>,
        #[serde(default)]
        delay_ms: u64,
    },
}

impl ResponseStep {
    /// Delay to wait before dispatching this step.
    pub fn delay_ms(&self) -> u64 {
        match self {
            ResponseStep::Text { delay_ms, .. }
            | ResponseStep::Media { delay_ms, .. }
            | ResponseStep::Menu { delay_ms, .. } => *delay_ms,
        }
    }
}

/// Kind of media carried by a [`ResponseStep::Media`] step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Document => write!(f, "document"),
        }
    }
}

/// One selectable entry in a menu step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Flow {
    /// Validate a single flow in isolation.
    ///
    /// Trigger values must be non-empty after trimming; a flow with no
    /// steps is legal (it can exist purely to chain) but a menu step with
    /// no options is not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::InvalidFlow {
                flow_id: self.id.clone(),
                reason: "flow id cannot be empty".to_string(),
            });
        }
        if self.trigger.value().trim().is_empty() {
            return Err(ConfigError::InvalidFlow {
                flow_id: self.id.clone(),
                reason: "trigger value cannot be empty".to_string(),
            });
        }
        for step in &self.steps {
            if let ResponseStep::Menu { options, .. } = step
                && options.is_empty()
            {
                return Err(ConfigError::InvalidFlow {
                    flow_id: self.id.clone(),
                    reason: "menu step must have at least one option".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyword_flow(id: &str, value: &str) -> Flow {
        Flow {
            id: id.to_string(),
            name: id.to_string(),
            trigger: Trigger::Keyword {
                value: value.to_string(),
                case_sensitive: false,
            },
            steps: vec![ResponseStep::Text {
                content: "hi".to_string(),
                delay_ms: 0,
            }],
            next_flow_id: None,
            is_active: true,
        }
    }

    #[test]
    fn test_trigger_serde_tagged() {
        let trigger = Trigger::Keyword {
            value: "hello".to_string(),
            case_sensitive: false,
        };
        let json = serde_json::to_value(&trigger).unwrap();
        assert_eq!(json["type"], "keyword");
        assert_eq!(json["value"], "hello");

        let parsed: Trigger = serde_json::from_str(r#"{"type":"menu","value":"2"}"#).unwrap();
        assert_eq!(
            parsed,
            Trigger::Menu {
                value: "2".to_string()
            }
        );
    }

    #[test]
    fn test_step_serde_defaults() {
        let step: ResponseStep =
            serde_json::from_str(r#"{"type":"text","content":"hello"}"#).unwrap();
        assert_eq!(step.delay_ms(), 0);

        let step: ResponseStep =
            serde_json::from_str(r#"{"type":"media","kind":"image","content":"cap"}"#).unwrap();
        match step {
            ResponseStep::Media {
                kind, media_url, ..
            } => {
                assert_eq!(kind, MediaKind::Image);
                assert!(media_url.is_none());
            }
            other => panic!("expected media step, got {other:?}"),
        }
    }

    #[test]
    fn test_flow_defaults_active() {
        let json = r#"{
            "id": "f1",
            "name": "Greeting",
            "trigger": {"type": "keyword", "value": "hi"},
            "steps": []
        }"#;
        let flow: Flow = serde_json::from_str(json).unwrap();
        assert!(flow.is_active);
        assert!(flow.next_flow_id.is_none());
    }

    #[test]
    fn test_validate_empty_trigger_value() {
        let mut flow = keyword_flow("f1", "  ");
        assert!(flow.validate().is_err());
        flow.trigger = Trigger::Keyword {
            value: "hi".to_string(),
            case_sensitive: false,
        };
        assert!(flow.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_menu_options() {
        let mut flow = keyword_flow("f1", "menu");
        flow.steps = vec![ResponseStep::Menu {
            content: "pick one".to_string(),
            options: vec![],
            delay_ms: 0,
        }];
        assert!(flow.validate().is_err());
    }

    #[test]
    fn test_media_kind_display() {
        assert_eq!(MediaKind::Document.to_string(), "document");
    }
}
