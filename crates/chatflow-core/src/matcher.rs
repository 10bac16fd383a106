//! Trigger matcher: first matching flow wins.
//!
//! A pure function of (ordered flow list, normalized input) -- no hidden
//! state. List order is the priority rule: a broad substring flow placed
//! before a precise one always wins. That is deliberate and documented
//! behavior, not a bug.

use chatflow_types::bot::BotConfig;
use chatflow_types::flow::{Flow, Trigger};

/// Find the flow that should answer `text`, or the default flow, or none.
///
/// `text` is expected to be pre-trimmed (see
/// `InboundMessage::normalized_body`). Inactive flows are skipped.
pub fn match_flow<'a>(bot: &'a BotConfig, text: &str) -> Option<&'a Flow> {
    for flow in bot.flows.iter().filter(|f| f.is_active) {
        if trigger_matches(&flow.trigger, text) {
            return Some(flow);
        }
    }

    bot.default_flow.as_ref().filter(|f| f.is_active)
}

/// Whether a single trigger matches the inbound text.
fn trigger_matches(trigger: &Trigger, text: &str) -> bool {
    match trigger {
        Trigger::Keyword {
            value,
            case_sensitive,
        } => {
            if *case_sensitive {
                text == value || text.contains(value.as_str())
            } else {
                let text = text.to_lowercase();
                let value = value.to_lowercase();
                text == value || text.contains(&value)
            }
        }
        // Menu replies must be exact: "2" is a selection, "22" is not.
        Trigger::Menu { value } => text == value,
        // Webhook triggers are fired externally, never by inbound text.
        Trigger::Webhook { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_types::flow::ResponseStep;

    fn flow(id: &str, trigger: Trigger) -> Flow {
        Flow {
            id: id.to_string(),
            name: id.to_string(),
            trigger,
            steps: vec![ResponseStep::Text {
                content: "ok".to_string(),
                delay_ms: 0,
            }],
            next_flow_id: None,
            is_active: true,
        }
    }

    fn keyword(id: &str, value: &str) -> Flow {
        flow(
            id,
            Trigger::Keyword {
                value: value.to_string(),
                case_sensitive: false,
            },
        )
    }

    fn bot_with(flows: Vec<Flow>) -> BotConfig {
        let mut bot = BotConfig::new("owner", "session");
        bot.flows = flows;
        bot
    }

    #[test]
    fn test_list_order_beats_specificity() {
        let bot = bot_with(vec![keyword("a", "hi"), keyword("b", "hi there")]);
        let matched = match_flow(&bot, "hi there").unwrap();
        assert_eq!(matched.id, "a");
    }

    #[test]
    fn test_case_insensitive_containment() {
        let bot = bot_with(vec![keyword("hello", "Hello")]);
        assert!(match_flow(&bot, "HELLO WORLD, how are you").is_some());
    }

    #[test]
    fn test_case_sensitive_keyword() {
        let bot = bot_with(vec![flow(
            "strict",
            Trigger::Keyword {
                value: "Hello".to_string(),
                case_sensitive: true,
            },
        )]);
        assert!(match_flow(&bot, "say Hello please").is_some());
        assert!(match_flow(&bot, "say hello please").is_none());
    }

    #[test]
    fn test_menu_exact_equality_only() {
        let bot = bot_with(vec![flow(
            "opt2",
            Trigger::Menu {
                value: "2".to_string(),
            },
        )]);
        assert!(match_flow(&bot, "2").is_some());
        assert!(match_flow(&bot, "22").is_none());
        assert!(match_flow(&bot, "option 2").is_none());
    }

    #[test]
    fn test_webhook_never_matches_text() {
        let bot = bot_with(vec![flow(
            "hook",
            Trigger::Webhook {
                value: "order-shipped".to_string(),
            },
        )]);
        assert!(match_flow(&bot, "order-shipped").is_none());
    }

    #[test]
    fn test_inactive_flows_skipped() {
        let mut first = keyword("a", "hi");
        first.is_active = false;
        let bot = bot_with(vec![first, keyword("b", "hi")]);
        assert_eq!(match_flow(&bot, "hi").unwrap().id, "b");
    }

    #[test]
    fn test_default_flow_on_no_match() {
        let mut bot = bot_with(vec![keyword("a", "hi")]);
        bot.default_flow = Some(keyword("default", "unused"));
        assert_eq!(match_flow(&bot, "something else").unwrap().id, "default");
    }

    #[test]
    fn test_inactive_default_flow_is_no_match() {
        let mut bot = bot_with(vec![]);
        let mut default = keyword("default", "unused");
        default.is_active = false;
        bot.default_flow = Some(default);
        assert!(match_flow(&bot, "anything").is_none());
    }

    #[test]
    fn test_no_flows_no_match() {
        let bot = bot_with(vec![]);
        assert!(match_flow(&bot, "hi").is_none());
    }
}
