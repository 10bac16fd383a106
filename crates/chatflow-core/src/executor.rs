//! Flow executor: runs a matched flow's steps and follows the chain.
//!
//! Steps run strictly in order, each after its configured delay. Delays
//! are cooperative tokio sleeps -- they suspend only the message being
//! processed, never the engine. Transport errors abort the remainder of
//! the chain (abort-on-error semantics: the caller reports the message as
//! not handled).
//!
//! Chains (`next_flow_id`) execute within the same processing call, with
//! a fixed inter-flow delay between links. A visited-set plus a depth cap
//! guard against cyclic or runaway chains: either condition terminates
//! the chain with a warning, it is not an error.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use chatflow_types::bot::BotConfig;
use chatflow_types::error::TransportError;
use chatflow_types::flow::{Flow, MenuOption, ResponseStep};

use crate::template;
use crate::transport::Transport;

/// Maximum flows executed per chain within one message.
pub const MAX_CHAIN_DEPTH: usize = 8;

/// Fixed pause between chained flows.
pub const INTER_FLOW_DELAY_MS: u64 = 1_000;

/// Upper bound on any single transport dispatch, so a stalled media send
/// cannot block a chat's in-flight message forever.
pub const DISPATCH_TIMEOUT_MS: u64 = 30_000;

/// Addressing and personalization for one execution.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub session_id: &'a str,
    pub chat_id: &'a str,
    pub contact_name: Option<&'a str>,
}

/// Execute `first` and every active flow it chains to.
///
/// `first` must belong to `bot` (flow list or default flow). A dangling
/// or inactive `next_flow_id` terminates the chain quietly.
pub async fn execute_chain<'a, T: Transport>(
    transport: &T,
    bot: &'a BotConfig,
    first: &'a Flow,
    ctx: &ExecutionContext<'_>,
) -> Result<(), TransportError> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = first;

    loop {
        if !visited.insert(current.id.as_str()) {
            tracing::warn!(flow_id = %current.id, "flow chain revisited a flow, stopping");
            break;
        }
        if visited.len() > MAX_CHAIN_DEPTH {
            tracing::warn!(
                flow_id = %current.id,
                max_depth = MAX_CHAIN_DEPTH,
                "flow chain exceeded max depth, stopping"
            );
            break;
        }

        execute_flow(transport, bot, current, ctx).await?;

        let next = current
            .next_flow_id
            .as_deref()
            .and_then(|id| bot.flow_by_id(id))
            .filter(|f| f.is_active);

        match next {
            Some(next_flow) => {
                tokio::time::sleep(Duration::from_millis(INTER_FLOW_DELAY_MS)).await;
                current = next_flow;
            }
            None => break,
        }
    }

    Ok(())
}

/// Run the steps of a single flow, in order.
async fn execute_flow<T: Transport>(
    transport: &T,
    bot: &BotConfig,
    flow: &Flow,
    ctx: &ExecutionContext<'_>,
) -> Result<(), TransportError> {
    tracing::debug!(flow_id = %flow.id, steps = flow.steps.len(), "executing flow");

    for step in &flow.steps {
        let delay = step.delay_ms();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let now = bot_local_now(bot);
        match step {
            ResponseStep::Text { content, .. } => {
                let text = template::render(content, ctx.contact_name, &now);
                dispatch(transport.send_text(ctx.session_id, ctx.chat_id, &text)).await?;
            }
            ResponseStep::Media {
                content, media_url, ..
            } => {
                let Some(url) = media_url else {
                    tracing::debug!(flow_id = %flow.id, "media step without url, skipping");
                    continue;
                };
                let caption = template::render(content, ctx.contact_name, &now);
                dispatch(transport.send_media_from_url(
                    ctx.session_id,
                    ctx.chat_id,
                    url,
                    &caption,
                ))
                .await?;
            }
            ResponseStep::Menu {
                content, options, ..
            } => {
                let header = template::render(content, ctx.contact_name, &now);
                let text = render_menu(&header, options);
                dispatch(transport.send_text(ctx.session_id, ctx.chat_id, &text)).await?;
            }
        }
    }

    Ok(())
}

/// Wrap a transport call in the per-dispatch timeout.
async fn dispatch<F>(fut: F) -> Result<(), TransportError>
where
    F: std::future::Future<Output = Result<(), TransportError>>,
{
    match tokio::time::timeout(Duration::from_millis(DISPATCH_TIMEOUT_MS), fut).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(DISPATCH_TIMEOUT_MS)),
    }
}

/// Header plus a 1-indexed option list: title line, then an indented
/// description line when present.
fn render_menu(header: &str, options: &[MenuOption]) -> String {
    let mut out = String::from(header);
    out.push('\n');
    for (index, option) in options.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!("{}. {}", index + 1, option.title));
        if let Some(description) = &option.description {
            out.push_str(&format!("\n   {description}"));
        }
    }
    out
}

/// "Now" in the bot's configured timezone (working-hours timezone when
/// set, UTC otherwise) so `{time}`/`{day}` placeholders read local. The
/// orchestrator uses the same clock for fallback rendering.
pub(crate) fn bot_local_now(bot: &BotConfig) -> DateTime<Tz> {
    let tz = bot
        .settings
        .working_hours
        .as_ref()
        .and_then(|hours| hours.timezone.parse::<Tz>().ok())
        .unwrap_or(chrono_tz::UTC);
    Utc::now().with_timezone(&tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Transport double that records sends and can fail the Nth dispatch.
    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<String>>,
        fail_at: Option<usize>,
    }

    impl FakeTransport {
        fn failing_at(index: usize) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_at: Some(index),
            }
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        fn record(&self, entry: String) -> Result<(), TransportError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_at == Some(sent.len()) {
                return Err(TransportError::Delivery("boom".to_string()));
            }
            sent.push(entry);
            Ok(())
        }
    }

    impl Transport for FakeTransport {
        async fn send_text(
            &self,
            _session_id: &str,
            _chat_id: &str,
            text: &str,
        ) -> Result<(), TransportError> {
            self.record(format!("text:{text}"))
        }

        async fn send_media_from_url(
            &self,
            _session_id: &str,
            _chat_id: &str,
            url: &str,
            caption: &str,
        ) -> Result<(), TransportError> {
            self.record(format!("media:{url}:{caption}"))
        }
    }

    fn text_flow(id: &str, content: &str, next: Option<&str>) -> Flow {
        Flow {
            id: id.to_string(),
            name: id.to_string(),
            trigger: chatflow_types::flow::Trigger::Keyword {
                value: id.to_string(),
                case_sensitive: false,
            },
            steps: vec![ResponseStep::Text {
                content: content.to_string(),
                delay_ms: 0,
            }],
            next_flow_id: next.map(str::to_string),
            is_active: true,
        }
    }

    fn bot_with(flows: Vec<Flow>) -> BotConfig {
        let mut bot = BotConfig::new("owner", "session");
        bot.flows = flows;
        bot
    }

    fn ctx() -> ExecutionContext<'static> {
        ExecutionContext {
            session_id: "session",
            chat_id: "chat-1",
            contact_name: Some("Ana"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_sends_both_flows_in_one_call() {
        let bot = bot_with(vec![
            text_flow("a", "first", Some("b")),
            text_flow("b", "second", None),
        ]);
        let transport = FakeTransport::default();
        let started = tokio::time::Instant::now();
        execute_chain(&transport, &bot, &bot.flows[0], &ctx())
            .await
            .unwrap();
        assert_eq!(transport.sent(), vec!["text:first", "text:second"]);
        // The fixed inter-flow pause sits between the two sends.
        assert!(started.elapsed() >= Duration::from_millis(INTER_FLOW_DELAY_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dangling_next_flow_terminates_chain() {
        let bot = bot_with(vec![text_flow("a", "only", Some("missing"))]);
        let transport = FakeTransport::default();
        execute_chain(&transport, &bot, &bot.flows[0], &ctx())
            .await
            .unwrap();
        assert_eq!(transport.sent(), vec!["text:only"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_next_flow_terminates_chain() {
        let mut second = text_flow("b", "second", None);
        second.is_active = false;
        let bot = bot_with(vec![text_flow("a", "first", Some("b")), second]);
        let transport = FakeTransport::default();
        execute_chain(&transport, &bot, &bot.flows[0], &ctx())
            .await
            .unwrap();
        assert_eq!(transport.sent(), vec!["text:first"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cyclic_chain_stops_at_revisit() {
        let bot = bot_with(vec![
            text_flow("a", "ping", Some("b")),
            text_flow("b", "pong", Some("a")),
        ]);
        let transport = FakeTransport::default();
        execute_chain(&transport, &bot, &bot.flows[0], &ctx())
            .await
            .unwrap();
        assert_eq!(transport.sent(), vec!["text:ping", "text:pong"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_depth_cap_stops_long_chain() {
        let flows: Vec<Flow> = (0..12)
            .map(|i| {
                let next = if i < 11 { Some(format!("f{}", i + 1)) } else { None };
                text_flow(&format!("f{i}"), &format!("step {i}"), next.as_deref())
            })
            .collect();
        let bot = bot_with(flows);
        let transport = FakeTransport::default();
        execute_chain(&transport, &bot, &bot.flows[0], &ctx())
            .await
            .unwrap();
        assert_eq!(transport.sent().len(), MAX_CHAIN_DEPTH);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_aborts_chain() {
        let bot = bot_with(vec![
            text_flow("a", "first", Some("b")),
            text_flow("b", "second", None),
        ]);
        let transport = FakeTransport::failing_at(1);
        let result = execute_chain(&transport, &bot, &bot.flows[0], &ctx()).await;
        assert!(result.is_err());
        assert_eq!(transport.sent(), vec!["text:first"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_without_url_is_skipped() {
        let mut flow = text_flow("a", "after media", None);
        flow.steps.insert(
            0,
            ResponseStep::Media {
                kind: chatflow_types::flow::MediaKind::Image,
                content: "caption".to_string(),
                media_url: None,
                file_name: None,
                delay_ms: 0,
            },
        );
        let bot = bot_with(vec![flow]);
        let transport = FakeTransport::default();
        execute_chain(&transport, &bot, &bot.flows[0], &ctx())
            .await
            .unwrap();
        assert_eq!(transport.sent(), vec!["text:after media"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_media_with_url_sends_rendered_caption() {
        let mut flow = text_flow("a", "done", None);
        flow.steps = vec![ResponseStep::Media {
            kind: chatflow_types::flow::MediaKind::Document,
            content: "for {name}".to_string(),
            media_url: Some("https://example.com/doc.pdf".to_string()),
            file_name: Some("doc.pdf".to_string()),
            delay_ms: 0,
        }];
        let bot = bot_with(vec![flow]);
        let transport = FakeTransport::default();
        execute_chain(&transport, &bot, &bot.flows[0], &ctx())
            .await
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec!["media:https://example.com/doc.pdf:for Ana"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_menu_step_numbered_rendering() {
        let mut flow = text_flow("menu", "unused", None);
        flow.steps = vec![ResponseStep::Menu {
            content: "Pick one, {name}:".to_string(),
            options: vec![
                MenuOption {
                    id: "sales".to_string(),
                    title: "Sales".to_string(),
                    description: Some("Talk to sales".to_string()),
                },
                MenuOption {
                    id: "support".to_string(),
                    title: "Support".to_string(),
                    description: None,
                },
            ],
            delay_ms: 0,
        }];
        let bot = bot_with(vec![flow]);
        let transport = FakeTransport::default();
        execute_chain(&transport, &bot, &bot.flows[0], &ctx())
            .await
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec!["text:Pick one, Ana:\n\n1. Sales\n   Talk to sales\n2. Support"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_delay_elapses_before_dispatch() {
        let mut flow = text_flow("a", "late", None);
        flow.steps = vec![ResponseStep::Text {
            content: "late".to_string(),
            delay_ms: 5_000,
        }];
        let bot = bot_with(vec![flow]);
        let transport = FakeTransport::default();
        let started = tokio::time::Instant::now();
        execute_chain(&transport, &bot, &bot.flows[0], &ctx())
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(5_000));
        assert_eq!(transport.sent(), vec!["text:late"]);
    }
}
