//! Template placeholder rendering for response-step content.
//!
//! Supported placeholders: `{name}` (contact name or "there"), `{time}`
//! (HH:MM), `{date}` (YYYY-MM-DD), `{day}` (English weekday name). The
//! timestamp is passed in so the executor controls which timezone the
//! message-local time is rendered in, and so tests are deterministic.

use chrono::{DateTime, TimeZone};

/// Name used when the transport did not provide a contact name.
const ANONYMOUS_NAME: &str = "there";

/// Render all placeholders in `template`.
pub fn render<Tz: TimeZone>(
    template: &str,
    contact_name: Option<&str>,
    now: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let name = contact_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(ANONYMOUS_NAME);

    template
        .replace("{name}", name)
        .replace("{time}", &now.format("%H:%M").to_string())
        .replace("{date}", &now.format("%Y-%m-%d").to_string())
        .replace("{day}", &now.format("%A").to_string())
}
