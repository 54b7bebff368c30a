use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bookline::services::calendar::google::GoogleCalendarProvider;
use bookline::services::calendar::{CalendarProvider, NewEvent};

fn provider(server: &MockServer) -> GoogleCalendarProvider {
    GoogleCalendarProvider::new(
        format!("{}/calendar/v3", server.uri()),
        "test-access-token".to_string(),
        Duration::from_millis(500),
    )
    .unwrap()
}

fn window() -> (DateTime<Utc>, DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2025, 10, 1, 19, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 10, 1, 19, 30, 0).unwrap(),
    )
}

fn new_event() -> NewEvent {
    let tz = chrono_tz::America::New_York;
    let start = tz.with_ymd_and_hms(2025, 10, 1, 15, 0, 0).unwrap();
    NewEvent {
        start,
        end: start + chrono::Duration::minutes(30),
        summary: "Appointment with Ada".to_string(),
        description: "Name: Ada".to_string(),
        attendees: vec!["ada@example.com".to_string()],
    }
}

#[tokio::test]
async fn test_free_busy_returns_busy_intervals() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/freeBusy"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(body_partial_json(serde_json::json!({
            "timeMin": "2025-10-01T19:00:00Z",
            "timeMax": "2025-10-01T19:30:00Z",
            "items": [{ "id": "primary" }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "calendar#freeBusy",
            "calendars": {
                "primary": {
                    "busy": [
                        { "start": "2025-10-01T19:15:00Z", "end": "2025-10-01T20:00:00Z" }
                    ]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (start, end) = window();
    let busy = provider(&server)
        .busy_intervals("primary", start, end)
        .await
        .unwrap();

    assert_eq!(busy.len(), 1);
    assert_eq!(busy[0].start, Utc.with_ymd_and_hms(2025, 10, 1, 19, 15, 0).unwrap());
    assert!(busy[0].overlaps(start, end));
}

#[tokio::test]
async fn test_free_busy_empty_calendar() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/freeBusy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "calendars": { "primary": { "busy": [] } }
        })))
        .mount(&server)
        .await;

    let (start, end) = window();
    let busy = provider(&server)
        .busy_intervals("primary", start, end)
        .await
        .unwrap();
    assert!(busy.is_empty());
}

#[tokio::test]
async fn test_free_busy_calendar_error_is_failure_not_free() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/freeBusy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "calendars": {
                "primary": {
                    "errors": [{ "domain": "global", "reason": "notFound" }],
                    "busy": []
                }
            }
        })))
        .mount(&server)
        .await;

    let (start, end) = window();
    let err = provider(&server)
        .busy_intervals("primary", start, end)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("notFound"));
}

#[tokio::test]
async fn test_free_busy_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/freeBusy"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let (start, end) = window();
    let err = provider(&server)
        .busy_intervals("primary", start, end)
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("401"));
    assert!(text.contains("invalid credentials"));
}

#[tokio::test]
async fn test_free_busy_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/freeBusy"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "calendars": { "primary": { "busy": [] } } }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let (start, end) = window();
    let result = provider(&server).busy_intervals("primary", start, end).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_create_event_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/calendars/primary/events"))
        .and(query_param("sendUpdates", "all"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(body_partial_json(serde_json::json!({
            "summary": "Appointment with Ada",
            "start": { "dateTime": "2025-10-01T15:00:00-04:00", "timeZone": "America/New_York" },
            "end": { "dateTime": "2025-10-01T15:30:00-04:00", "timeZone": "America/New_York" },
            "attendees": [{ "email": "ada@example.com" }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "abc123xyz",
            "status": "confirmed",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = provider(&server)
        .create_event("primary", &new_event())
        .await
        .unwrap();
    assert_eq!(id, "abc123xyz");
}

#[tokio::test]
async fn test_create_event_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/v3/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(403).set_body_string("rateLimitExceeded"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .create_event("primary", &new_event())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("403"));
}
