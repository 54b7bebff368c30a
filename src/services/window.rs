use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::models::{
    AppointmentWindow, CallContext, DateResolution, DateSource, NeededField, ParseFailure,
    TimeOfDay,
};

/// Longest window accepted, one day.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

/// Combine the resolved pieces into a concrete window in the business timezone
/// (the one carried by `ctx`).
///
/// An inferred date whose window already started before the call is moved one
/// day forward, once. Explicit ISO dates are never moved; a past explicit window
/// is left for the orchestrator to reject. A duration that is missing (did not
/// parse), not positive, or longer than [`MAX_DURATION_MINUTES`] is reported as
/// needed.
pub fn build_window(
    date: Option<&DateResolution>,
    time: Option<TimeOfDay>,
    duration_minutes: Option<i64>,
    ctx: &CallContext,
) -> Result<AppointmentWindow, ParseFailure> {
    let mut needed = Vec::new();
    if date.is_none() {
        needed.push(NeededField::Date);
    }
    if time.is_none() {
        needed.push(NeededField::Time);
    }
    let duration = duration_minutes
        .filter(|m| (1..=MAX_DURATION_MINUTES).contains(m))
        .and_then(Duration::try_minutes);
    if duration.is_none() {
        needed.push(NeededField::Duration);
    }

    let (Some(date), Some(time), Some(duration)) = (date, time, duration) else {
        return Err(ParseFailure { needed });
    };

    let tz = ctx.timezone;
    let mut start = local_instant(date.date, time, &tz).ok_or_else(|| ParseFailure {
        needed: vec![NeededField::Date],
    })?;

    if start < ctx.instant && date.source != DateSource::ExplicitIso {
        let next_day = date.date.checked_add_days(Days::new(1));
        if let Some(corrected) = next_day.and_then(|d| local_instant(d, time, &tz)) {
            tracing::debug!(
                original = %start,
                corrected = %corrected,
                "inferred window in the past, moved one day forward"
            );
            start = corrected;
        }
    }

    let end = start.checked_add_signed(duration).ok_or_else(|| ParseFailure {
        needed: vec![NeededField::Duration],
    })?;

    Ok(AppointmentWindow {
        start,
        end,
        timezone: tz,
        duration_minutes: duration.num_minutes(),
    })
}

/// Local wall-clock time to an instant. Ambiguous times (DST fall-back) take the
/// earlier instant; times inside a spring-forward gap move forward an hour.
fn local_instant(date: NaiveDate, time: TimeOfDay, tz: &Tz) -> Option<DateTime<Tz>> {
    let naive = date.and_time(time.to_naive_time());
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}
