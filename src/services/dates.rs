//! Date phrase resolution.
//!
//! Resolution runs in a fixed order and the first match wins:
//!
//! 1. strict `YYYY-MM-DD`, taken verbatim
//! 2. natural-language forms, biased toward the nearest future date
//! 3. yearless month/day patterns in the current year, rolled into next year
//!    if the date has already ended
//!
//! Anything else is unresolved. An absent phrase is unresolved too; callers must
//! state a date before a slot is booked.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Weekday};
use chrono_tz::Tz;
use regex::Regex;

use crate::models::{CallContext, DateResolution, DateSource};

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";
const ORDINAL: &str = r"(\d{1,2})(?:st|nd|rd|th)?";

struct DatePatterns {
    iso: Regex,
    weekday: Regex,
    in_n: Regex,
    ordinal_day: Regex,
    month_day_year: Regex,
    day_month_year: Regex,
    numeric_year: Regex,
    month_day: Regex,
    day_month: Regex,
    numeric: Regex,
}

fn patterns() -> &'static DatePatterns {
    static PATTERNS: OnceLock<DatePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("static date pattern");
        DatePatterns {
            iso: re(r"^\d{4}-\d{2}-\d{2}$"),
            weekday: re(
                r"^(?:(this|next|coming|upcoming)\s+)?(mon(?:day)?|tue(?:s(?:day)?)?|wed(?:nesday)?|thu(?:rs(?:day)?)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?)$",
            ),
            in_n: re(r"^in\s+(\d{1,3}|a|an|one|two|three|four|five|six|seven)\s+(days?|weeks?)$"),
            ordinal_day: re(r"^(?:the\s+)?(\d{1,2})(?:st|nd|rd|th)(?:\s+of\s+(?:the|this)\s+month)?$"),
            month_day_year: re(&format!(r"^{MONTH}\s+{ORDINAL}\s+(\d{{4}})$")),
            day_month_year: re(&format!(r"^(?:the\s+)?{ORDINAL}\s+(?:of\s+)?{MONTH}\s+(\d{{4}})$")),
            numeric_year: re(r"^(\d{1,2})/(\d{1,2})/(\d{4})$"),
            month_day: re(&format!(r"^{MONTH}\s+(?:the\s+)?{ORDINAL}$")),
            day_month: re(&format!(r"^(?:the\s+)?{ORDINAL}\s+(?:of\s+)?{MONTH}$")),
            numeric: re(r"^(\d{1,2})[/-](\d{1,2})$"),
        }
    })
}

pub fn resolve_date(phrase: Option<&str>, ctx: &CallContext) -> Option<DateResolution> {
    let phrase = phrase.map(str::trim).filter(|p| !p.is_empty())?;

    if let Some(date) = parse_explicit_iso(phrase) {
        return Some(DateResolution {
            date,
            source: DateSource::ExplicitIso,
        });
    }

    let normalized = normalize(phrase);

    if let Some(date) = parse_natural(&normalized, ctx.today()) {
        return Some(DateResolution {
            date,
            source: DateSource::NaturalLanguage,
        });
    }

    if let Some(date) = parse_fallback_pattern(&normalized, ctx) {
        return Some(DateResolution {
            date,
            source: DateSource::PatternFallback,
        });
    }

    tracing::debug!(phrase, "date phrase unresolved");
    None
}

fn parse_explicit_iso(phrase: &str) -> Option<NaiveDate> {
    if !patterns().iso.is_match(phrase) {
        return None;
    }
    NaiveDate::parse_from_str(phrase, "%Y-%m-%d").ok()
}

/// Lowercase, drop punctuation that callers and transcribers sprinkle in, strip
/// filler words and a leading weekday in front of a full date.
fn normalize(phrase: &str) -> String {
    let lowered = phrase.to_lowercase().replace([',', '.'], " ");
    let mut words: Vec<&str> = lowered.split_whitespace().collect();

    while let Some(first) = words.first() {
        if matches!(*first, "on" | "for" | "at") && words.len() > 1 {
            words.remove(0);
        } else {
            break;
        }
    }

    // "wednesday october 1st" -> "october 1st"
    if words.len() > 1 && parse_weekday(words[0]).is_some() && !is_weekday_modifier(words[1]) {
        words.remove(0);
    }

    words.join(" ")
}

fn is_weekday_modifier(word: &str) -> bool {
    matches!(word, "this" | "next" | "coming" | "upcoming")
}

fn parse_natural(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let p = patterns();

    match s {
        "today" | "tonight" | "this afternoon" | "this evening" | "this morning" => {
            return Some(today)
        }
        "tomorrow" | "tmrw" | "tomorrow morning" | "tomorrow afternoon" | "tomorrow evening" => {
            return today.checked_add_days(Days::new(1))
        }
        "day after tomorrow" | "the day after tomorrow" => {
            return today.checked_add_days(Days::new(2))
        }
        _ => {}
    }

    if let Some(caps) = p.weekday.captures(s) {
        let target = parse_weekday(&caps[2])?;
        let strictly_after_today = caps.get(1).map(|m| m.as_str() == "next").unwrap_or(false);
        return Some(next_weekday(today, target, strictly_after_today));
    }

    if let Some(caps) = p.in_n.captures(s) {
        let n = parse_count(&caps[1])?;
        let days = if caps[2].starts_with("week") { n * 7 } else { n };
        return today.checked_add_days(Days::new(days));
    }

    if let Some(caps) = p.ordinal_day.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        return next_day_of_month(today, day);
    }

    if let Some(caps) = p.month_day_year.captures(s) {
        let month = parse_month(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = p.day_month_year.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month = parse_month(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = p.numeric_year.captures(s) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

fn parse_fallback_pattern(s: &str, ctx: &CallContext) -> Option<NaiveDate> {
    let p = patterns();

    let (month, day) = if let Some(caps) = p.month_day.captures(s) {
        (parse_month(&caps[1])?, caps[2].parse().ok()?)
    } else if let Some(caps) = p.day_month.captures(s) {
        (parse_month(&caps[2])?, caps[1].parse().ok()?)
    } else if let Some(caps) = p.numeric.captures(s) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?)
    } else {
        return None;
    };

    let year = ctx.today().year();
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) if !has_ended(date, ctx) => Some(date),
        // Already over this year (or Feb 29 in a common year): take next year's.
        _ => NaiveDate::from_ymd_opt(year + 1, month, day),
    }
}

/// True if the last second of `date` in the business timezone is before the call.
fn has_ended(date: NaiveDate, ctx: &CallContext) -> bool {
    match end_of_day(date, &ctx.timezone) {
        Some(end) => end < ctx.instant,
        None => date < ctx.today(),
    }
}

fn end_of_day(date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(23, 59, 59)?;
    tz.from_local_datetime(&naive).latest()
}

/// Nearest occurrence of `target` on or after `today`; with `strictly_after_today`
/// a match on today itself moves a week out.
fn next_weekday(today: NaiveDate, target: Weekday, strictly_after_today: bool) -> NaiveDate {
    let from = today.weekday().num_days_from_monday();
    let to = target.num_days_from_monday();
    let mut ahead = (7 + to - from) % 7;
    if ahead == 0 && strictly_after_today {
        ahead = 7;
    }
    today + Days::new(u64::from(ahead))
}

/// Nearest upcoming date with the given day-of-month, today included. Months too
/// short for the day are skipped.
fn next_day_of_month(today: NaiveDate, day: u32) -> Option<NaiveDate> {
    if !(1..=31).contains(&day) {
        return None;
    }
    let first_of_month = today.with_day(1)?;
    (0..12).find_map(|offset| {
        let month_start = first_of_month.checked_add_months(Months::new(offset))?;
        let candidate = month_start.with_day(day)?;
        (candidate >= today).then_some(candidate)
    })
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_month(s: &str) -> Option<u32> {
    let month = match s.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_count(s: &str) -> Option<u64> {
    match s {
        "a" | "an" | "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        digits => digits.parse().ok(),
    }
}
