use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::CallContext;

/// Build the request's anchor instant. The transport header wins over the body
/// value; anything missing or unparseable falls back to `now`.
pub fn resolve_call_context(
    header_timestamp: Option<&str>,
    body_timestamp: Option<&str>,
    timezone: Tz,
    now: DateTime<Utc>,
) -> CallContext {
    let chosen = header_timestamp
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| body_timestamp.map(str::trim).filter(|s| !s.is_empty()));

    let instant = match chosen {
        Some(raw) => parse_instant(raw).unwrap_or_else(|| {
            tracing::warn!(timestamp = raw, "unparseable call timestamp, using current time");
            now
        }),
        None => now,
    };

    CallContext::new(instant, timezone)
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Some platforms send epoch milliseconds
    if raw.len() >= 12 && raw.chars().all(|c| c.is_ascii_digit()) {
        return raw.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis);
    }
    None
}
