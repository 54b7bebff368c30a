use std::sync::OnceLock;

use regex::Regex;

use crate::models::TimeOfDay;

pub const DEFAULT_DURATION_MINUTES: i64 = 30;

struct TimePatterns {
    clock_24h: Regex,
    meridiem: Regex,
    bare_hour: Regex,
    hours: Regex,
    trailing_minutes: Regex,
    minutes: Regex,
}

fn patterns() -> &'static TimePatterns {
    static PATTERNS: OnceLock<TimePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("static time pattern");
        TimePatterns {
            clock_24h: re(r"^(\d{1,2}):(\d{2})$"),
            // 3pm, 3 pm, 3:30pm, 330 pm, 3:30 p.m.
            meridiem: re(r"(?i)^(\d{1,2}):?(\d{2})?\s*([ap])\.?\s*m\.?$"),
            bare_hour: re(r"^(\d{1,2})$"),
            // "1 hour", "2hrs", "1-2 hours" (upper end of a range)
            hours: re(r"(?i)(?:^|[^\d])(-?\d+)\s*(?:h|hrs?|hours?)\b"),
            trailing_minutes: re(r"(?i)(\d+)\s*(?:m|mins?|minutes?)\b"),
            minutes: re(r"-?\d+"),
        }
    })
}

/// Resolve a spoken or typed time. Only three deterministic shapes are accepted:
/// `HH:mm`, `H[:mm] am|pm`, and a bare hour. Free-form phrases are unresolved.
pub fn resolve_time(phrase: Option<&str>) -> Option<TimeOfDay> {
    let s = phrase.map(str::trim).filter(|p| !p.is_empty())?;
    let p = patterns();

    if let Some(caps) = p.clock_24h.captures(s) {
        return TimeOfDay::new(caps[1].parse().ok()?, caps[2].parse().ok()?);
    }

    if let Some(caps) = p.meridiem.captures(s) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        if !(1..=12).contains(&hour) {
            return None;
        }
        let is_pm = caps[3].eq_ignore_ascii_case("p");
        let hour = match (hour, is_pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        return TimeOfDay::new(hour, minute);
    }

    if let Some(caps) = p.bare_hour.captures(s) {
        return TimeOfDay::new(caps[1].parse().ok()?, 0);
    }

    tracing::debug!(phrase = s, "time phrase unresolved");
    None
}

/// Minutes requested by a duration phrase. Hours are converted ("1 hour 30 min"
/// -> 90); otherwise the first integer is taken ("45 minutes" -> 45). A phrase
/// without digits gets the default. `None` means the number does not fit.
/// Zero and negative values come back as given; the window builder rejects them.
pub fn parse_duration_minutes(phrase: Option<&str>) -> Option<i64> {
    let Some(s) = phrase else {
        return Some(DEFAULT_DURATION_MINUTES);
    };
    let p = patterns();

    if let Some(caps) = p.hours.captures(s) {
        let hours: i64 = caps[1].parse().ok()?;
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(s.len());
        let extra = match p.trailing_minutes.captures(&s[whole..]) {
            Some(m) => m[1].parse::<i64>().ok()?,
            None => 0,
        };
        let extra = if hours < 0 { -extra } else { extra };
        return hours.checked_mul(60)?.checked_add(extra);
    }

    match p.minutes.find(s) {
        Some(m) => m.as_str().parse::<i64>().ok(),
        None => Some(DEFAULT_DURATION_MINUTES),
    }
}
