use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::models::{
    AppointmentSummary, AppointmentWindow, BookingOutcome, BookingRequest, BookingResponse,
    CallContext, Contact, NeededField, ParseFailure,
};
use crate::services::calendar::{BusyInterval, CalendarProvider, NewEvent};
use crate::services::context::resolve_call_context;
use crate::services::dates::resolve_date;
use crate::services::times::{parse_duration_minutes, resolve_time};
use crate::services::window::build_window;
use crate::state::AppState;

/// Result of the free/busy step.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    Free,
    Busy(Vec<BusyInterval>),
    CheckFailed(String),
}

/// Result of the create step.
#[derive(Debug, Clone, PartialEq)]
pub enum Creation {
    Created(String),
    Failed(String),
}

/// Run one request end to end: context, date, time, window, then the calendar.
/// Never fails; every problem becomes a `BookingResponse`.
pub async fn process_request(
    state: &AppState,
    request: &BookingRequest,
    header_timestamp: Option<&str>,
    now: DateTime<Utc>,
) -> BookingResponse {
    let ctx = resolve_call_context(
        header_timestamp,
        request.call_timestamp.as_deref(),
        state.config.business_timezone,
        now,
    );

    let date = resolve_date(request.date.as_deref(), &ctx);
    let time = resolve_time(request.time.as_deref());
    let duration = parse_duration_minutes(request.duration.as_deref());

    tracing::info!(
        call_instant = %ctx.instant,
        date = ?date.map(|d| d.date),
        date_source = date.map(|d| d.source.as_str()).unwrap_or("unresolved"),
        time = ?time.map(|t| (t.hour(), t.minute())),
        duration = ?duration,
        auto_book = request.auto_book,
        "resolved appointment request"
    );

    let window = match build_window(date.as_ref(), time, duration, &ctx) {
        Ok(window) => window,
        Err(failure) => {
            tracing::info!(need = %failure.need_key(), "could not build appointment window");
            return render_response(&BookingOutcome::ParseFailure(failure), None);
        }
    };

    let outcome = orchestrate(state, &ctx, &window, &request.contact(), request.auto_book).await;

    tracing::info!(
        outcome = outcome.as_str(),
        start = %window.start,
        event_id = outcome.event_id().unwrap_or(""),
        "booking pipeline finished"
    );

    render_response(&outcome, Some(&window))
}

/// Check the window against the calendar and, when asked, book it.
///
/// Creation is only attempted after a free result observed in this same call.
/// With `auto_book`, check and create run under the calendar's booking lock.
pub async fn orchestrate(
    state: &AppState,
    ctx: &CallContext,
    window: &AppointmentWindow,
    contact: &Contact,
    auto_book: bool,
) -> BookingOutcome {
    if window.start < ctx.instant {
        return BookingOutcome::PastWindow;
    }

    let calendar = state.calendar.as_ref();
    let calendar_id = state.config.calendar_id.as_str();
    let timeout = state.config.calendar_timeout;

    if !auto_book {
        return match check_availability(calendar, calendar_id, window, timeout).await {
            Availability::Free => BookingOutcome::Available,
            Availability::Busy(_) => BookingOutcome::SlotBusy,
            Availability::CheckFailed(cause) => BookingOutcome::AvailabilityCheckFailed { cause },
        };
    }

    let lock = state.booking_locks.for_calendar(calendar_id);
    let _guard = lock.lock().await;

    match check_availability(calendar, calendar_id, window, timeout).await {
        Availability::Busy(_) => BookingOutcome::SlotBusy,
        Availability::CheckFailed(cause) => BookingOutcome::AvailabilityCheckFailed { cause },
        Availability::Free => {
            let event = NewEvent::for_contact(window, contact);
            match create_appointment(calendar, calendar_id, &event, timeout).await {
                Creation::Created(event_id) => BookingOutcome::Booked { event_id },
                Creation::Failed(cause) => BookingOutcome::CreateFailed { cause },
            }
        }
    }
}

pub async fn check_availability(
    calendar: &dyn CalendarProvider,
    calendar_id: &str,
    window: &AppointmentWindow,
    timeout: Duration,
) -> Availability {
    let start = window.start.with_timezone(&Utc);
    let end = window.end.with_timezone(&Utc);

    let result = tokio::time::timeout(timeout, calendar.busy_intervals(calendar_id, start, end)).await;

    match result {
        Ok(Ok(intervals)) => {
            let conflicts: Vec<BusyInterval> = intervals
                .into_iter()
                .filter(|busy| busy.overlaps(start, end))
                .collect();
            if conflicts.is_empty() {
                Availability::Free
            } else {
                tracing::info!(conflicts = conflicts.len(), %start, "slot busy");
                Availability::Busy(conflicts)
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "availability check failed");
            Availability::CheckFailed(format!("{e:#}"))
        }
        Err(_) => {
            tracing::warn!(timeout_secs = timeout.as_secs(), "availability check timed out");
            Availability::CheckFailed(timed_out(timeout))
        }
    }
}

pub async fn create_appointment(
    calendar: &dyn CalendarProvider,
    calendar_id: &str,
    event: &NewEvent,
    timeout: Duration,
) -> Creation {
    match tokio::time::timeout(timeout, calendar.create_event(calendar_id, event)).await {
        Ok(Ok(event_id)) => Creation::Created(event_id),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "event creation failed after free check");
            Creation::Failed(format!("{e:#}"))
        }
        Err(_) => {
            tracing::error!(timeout_secs = timeout.as_secs(), "event creation timed out");
            Creation::Failed(timed_out(timeout))
        }
    }
}

fn timed_out(timeout: Duration) -> String {
    format!("timed out after {}s", timeout.as_secs_f64())
}

pub fn render_response(
    outcome: &BookingOutcome,
    window: Option<&AppointmentWindow>,
) -> BookingResponse {
    let when = window.map(spoken_when).unwrap_or_else(|| "that time".to_string());

    let (message, error, need) = match outcome {
        BookingOutcome::Booked { .. } => (
            format!("You're all set! Your appointment is booked for {when}."),
            None,
            None,
        ),
        BookingOutcome::Available => (
            format!("Good news, {when} is available. Would you like me to book it?"),
            None,
            None,
        ),
        BookingOutcome::SlotBusy => (
            format!("Sorry, {when} is already taken. Is there another time that works for you?"),
            None,
            None,
        ),
        BookingOutcome::ParseFailure(failure) => (
            clarification_message(failure),
            Some(format!("could not parse {}", field_list(failure))),
            Some(failure.need_key()),
        ),
        BookingOutcome::PastWindow => (
            "That time has already passed. Could you choose a time in the future?".to_string(),
            Some("requested appointment time is in the past".to_string()),
            None,
        ),
        BookingOutcome::AvailabilityCheckFailed { cause } => (
            "Sorry, I'm having trouble checking the calendar right now. Please try again in a moment."
                .to_string(),
            Some(cause.clone()),
            None,
        ),
        BookingOutcome::CreateFailed { cause } => (
            format!(
                "{} is available, but I wasn't able to finish the booking. Please try again in a moment.",
                capitalize(&when)
            ),
            Some(cause.clone()),
            None,
        ),
    };

    BookingResponse {
        is_free: outcome.is_free(),
        event_id: outcome.event_id().map(str::to_string),
        message,
        appointment: window.map(AppointmentSummary::from),
        error,
        need,
    }
}

fn clarification_message(failure: &ParseFailure) -> String {
    match failure.needed.as_slice() {
        [NeededField::Date] => {
            "Sorry, I didn't catch the date. What date would you like to come in?".to_string()
        }
        [NeededField::Time] => {
            "Sorry, I didn't catch the time. What time would you like?".to_string()
        }
        [NeededField::Duration] => {
            "Sorry, I didn't catch how long the appointment should be. How many minutes do you need?"
                .to_string()
        }
        _ => format!(
            "Sorry, I didn't catch the {}. Could you tell me again?",
            field_list(failure)
        ),
    }
}

fn field_list(failure: &ParseFailure) -> String {
    let names: Vec<&str> = failure
        .needed
        .iter()
        .map(|field| match field {
            NeededField::Date => "date",
            NeededField::Time => "time",
            NeededField::Duration => "appointment length",
        })
        .collect();
    names.join(" and ")
}

/// "Wednesday, October 1 at 3:00 pm"
fn spoken_when(window: &AppointmentWindow) -> String {
    window.start.format("%A, %B %-d at %-I:%M %P").to_string()
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + c.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    use crate::config::AppConfig;
    use crate::state::AppState;

    #[derive(Default)]
    struct Calls {
        checks: usize,
        creates: Vec<NewEvent>,
    }

    struct MockCalendar {
        busy: Vec<BusyInterval>,
        fail_check: bool,
        fail_create: bool,
        delay: Option<Duration>,
        calls: Arc<Mutex<Calls>>,
    }

    impl MockCalendar {
        fn free() -> Self {
            Self {
                busy: vec![],
                fail_check: false,
                fail_create: false,
                delay: None,
                calls: Arc::new(Mutex::new(Calls::default())),
            }
        }
    }

    #[async_trait]
    impl CalendarProvider for MockCalendar {
        async fn busy_intervals(
            &self,
            _calendar_id: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> anyhow::Result<Vec<BusyInterval>> {
            self.calls.lock().unwrap().checks += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_check {
                anyhow::bail!("credentials rejected");
            }
            Ok(self.busy.clone())
        }

        async fn create_event(&self, _calendar_id: &str, event: &NewEvent) -> anyhow::Result<String> {
            self.calls.lock().unwrap().creates.push(event.clone());
            if self.fail_create {
                anyhow::bail!("quota exceeded");
            }
            Ok("evt_123".to_string())
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            port: 3000,
            business_timezone: New_York,
            calendar_id: "primary".to_string(),
            google_access_token: String::new(),
            calendar_api_base: "http://localhost".to_string(),
            calendar_timeout: Duration::from_millis(200),
            api_secret: String::new(),
        }
    }

    fn state(calendar: MockCalendar) -> (AppState, Arc<Mutex<Calls>>) {
        let calls = Arc::clone(&calendar.calls);
        (AppState::new(config(), Box::new(calendar)), calls)
    }

    /// Saturday 2025-09-20, 10:00 in New York.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 20, 14, 0, 0).unwrap()
    }

    fn ctx() -> CallContext {
        CallContext::new(now(), New_York)
    }

    fn window(h: u32) -> AppointmentWindow {
        let start = New_York.with_ymd_and_hms(2025, 10, 1, h, 0, 0).unwrap();
        AppointmentWindow {
            start,
            end: start + chrono::Duration::minutes(30),
            timezone: New_York,
            duration_minutes: 30,
        }
    }

    fn busy_at(h: u32) -> BusyInterval {
        let start = New_York
            .with_ymd_and_hms(2025, 10, 1, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        BusyInterval {
            start,
            end: start + chrono::Duration::hours(1),
        }
    }

    fn request(date: &str, time: &str, auto_book: bool) -> BookingRequest {
        BookingRequest {
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            auto_book,
            ..BookingRequest::default()
        }
    }

    #[tokio::test]
    async fn test_free_and_auto_book_creates_once() {
        let (state, calls) = state(MockCalendar::free());
        let outcome = orchestrate(&state, &ctx(), &window(15), &Contact::default(), true).await;
        assert_eq!(
            outcome,
            BookingOutcome::Booked {
                event_id: "evt_123".to_string()
            }
        );
        let calls = calls.lock().unwrap();
        assert_eq!(calls.checks, 1);
        assert_eq!(calls.creates.len(), 1);
    }

    #[tokio::test]
    async fn test_busy_never_creates() {
        let mut calendar = MockCalendar::free();
        calendar.busy = vec![busy_at(15)];
        let (state, calls) = state(calendar);
        let outcome = orchestrate(&state, &ctx(), &window(15), &Contact::default(), true).await;
        assert_eq!(outcome, BookingOutcome::SlotBusy);
        assert!(calls.lock().unwrap().creates.is_empty());
    }

    #[tokio::test]
    async fn test_non_overlapping_busy_is_free() {
        let mut calendar = MockCalendar::free();
        // 14:00-15:00 ends exactly when the window starts
        calendar.busy = vec![busy_at(14)];
        let (state, _) = state(calendar);
        let outcome = orchestrate(&state, &ctx(), &window(15), &Contact::default(), false).await;
        assert_eq!(outcome, BookingOutcome::Available);
    }

    #[tokio::test]
    async fn test_availability_only_does_not_create() {
        let (state, calls) = state(MockCalendar::free());
        let outcome = orchestrate(&state, &ctx(), &window(15), &Contact::default(), false).await;
        assert_eq!(outcome, BookingOutcome::Available);
        assert!(calls.lock().unwrap().creates.is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_is_not_busy() {
        let mut calendar = MockCalendar::free();
        calendar.fail_create = true;
        let (state, calls) = state(calendar);
        let outcome = orchestrate(&state, &ctx(), &window(15), &Contact::default(), true).await;
        assert!(matches!(outcome, BookingOutcome::CreateFailed { ref cause } if cause.contains("quota")));
        assert_eq!(calls.lock().unwrap().creates.len(), 1);

        let response = render_response(&outcome, Some(&window(15)));
        assert!(response.is_free);
        assert_eq!(response.event_id, None);
    }

    #[tokio::test]
    async fn test_check_failure_skips_create() {
        let mut calendar = MockCalendar::free();
        calendar.fail_check = true;
        let (state, calls) = state(calendar);
        let outcome = orchestrate(&state, &ctx(), &window(15), &Contact::default(), true).await;
        assert!(matches!(outcome, BookingOutcome::AvailabilityCheckFailed { .. }));
        assert!(calls.lock().unwrap().creates.is_empty());
    }

    #[tokio::test]
    async fn test_check_timeout_is_distinct_failure() {
        let mut calendar = MockCalendar::free();
        calendar.delay = Some(Duration::from_secs(2));
        let (state, calls) = state(calendar);
        let outcome = orchestrate(&state, &ctx(), &window(15), &Contact::default(), true).await;
        match outcome {
            BookingOutcome::AvailabilityCheckFailed { cause } => assert!(cause.contains("timed out")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(calls.lock().unwrap().creates.is_empty());
    }

    #[tokio::test]
    async fn test_past_window_skips_calendar() {
        let (state, calls) = state(MockCalendar::free());
        let past = CallContext::new(Utc.with_ymd_and_hms(2025, 10, 2, 0, 0, 0).unwrap(), New_York);
        let outcome = orchestrate(&state, &past, &window(15), &Contact::default(), true).await;
        assert_eq!(outcome, BookingOutcome::PastWindow);
        assert_eq!(calls.lock().unwrap().checks, 0);
    }

    #[tokio::test]
    async fn test_process_request_books_explicit_iso() {
        let (state, _) = state(MockCalendar::free());
        let response = process_request(&state, &request("2025-10-01", "3 pm", true), None, now()).await;
        assert!(response.is_free);
        assert_eq!(response.event_id.as_deref(), Some("evt_123"));
        let appt = response.appointment.unwrap();
        assert_eq!(appt.time24, "15:00");
        assert_eq!(appt.time12, "3:00 pm");
        assert_eq!(appt.duration_minutes, 30);
        assert!(response.message.contains("Wednesday, October 1 at 3:00 pm"));
    }

    #[tokio::test]
    async fn test_process_request_garbage_date() {
        let (state, calls) = state(MockCalendar::free());
        let response = process_request(&state, &request("garbage", "3 pm", true), None, now()).await;
        assert!(!response.is_free);
        assert_eq!(response.event_id, None);
        assert!(response.message.contains("date"));
        assert_eq!(response.need.as_deref(), Some("date"));
        assert!(response.appointment.is_none());
        assert_eq!(calls.lock().unwrap().checks, 0);
    }

    #[tokio::test]
    async fn test_process_request_explicit_past_date() {
        let (state, calls) = state(MockCalendar::free());
        let response = process_request(&state, &request("2025-09-20", "9am", true), None, now()).await;
        assert!(!response.is_free);
        assert!(response.message.contains("already passed"));
        assert_eq!(response.appointment.unwrap().date, "2025-09-20");
        assert_eq!(calls.lock().unwrap().checks, 0);
    }

    #[tokio::test]
    async fn test_process_request_inferred_today_rolls_to_tomorrow() {
        let (state, _) = state(MockCalendar::free());
        let response = process_request(&state, &request("today", "9am", false), None, now()).await;
        assert!(response.is_free);
        assert_eq!(response.appointment.unwrap().date, "2025-09-21");
    }

    #[tokio::test]
    async fn test_process_request_uses_header_timestamp() {
        let (state, _) = state(MockCalendar::free());
        // Anchor on Oct 5: "the 1st" now means November 1st
        let response = process_request(
            &state,
            &request("the 1st", "10:00", false),
            Some("2025-10-05T12:00:00Z"),
            now(),
        )
        .await;
        assert_eq!(response.appointment.unwrap().date, "2025-11-01");
    }

    #[test]
    fn test_render_parse_failure_both_fields() {
        let failure = ParseFailure {
            needed: vec![NeededField::Date, NeededField::Time],
        };
        let response = render_response(&BookingOutcome::ParseFailure(failure), None);
        assert!(!response.is_free);
        assert_eq!(response.need.as_deref(), Some("date_and_time"));
        assert!(response.message.contains("date and time"));
        assert_eq!(response.error.as_deref(), Some("could not parse date and time"));
    }

    #[test]
    fn test_render_busy_message() {
        let response = render_response(&BookingOutcome::SlotBusy, Some(&window(15)));
        assert!(!response.is_free);
        assert!(response.message.contains("already taken"));
        assert!(response.error.is_none());
    }
}
