use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;

use super::{BusyInterval, CalendarProvider, NewEvent};

/// Google Calendar v3 over plain REST with a bearer access token.
pub struct GoogleCalendarProvider {
    api_base: String,
    access_token: String,
    client: reqwest::Client,
}

impl GoogleCalendarProvider {
    pub fn new(api_base: String, access_token: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build calendar HTTP client")?;

        Ok(Self {
            api_base,
            access_token,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .with_context(|| format!("invalid calendar API base: {}", self.api_base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("calendar API base cannot take a path: {}", self.api_base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyInterval>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

fn rfc3339<Tz: chrono::TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    async fn busy_intervals(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<BusyInterval>> {
        let url = self.endpoint(&["freeBusy"])?;
        let body = json!({
            "timeMin": rfc3339(&start),
            "timeMax": rfc3339(&end),
            "items": [{ "id": calendar_id }],
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("failed to call Google free/busy API")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Google free/busy error ({status}): {text}");
        }

        let mut data: FreeBusyResponse = resp
            .json()
            .await
            .context("failed to parse Google free/busy response")?;

        let calendar = data
            .calendars
            .remove(calendar_id)
            .ok_or_else(|| anyhow::anyhow!("calendar {calendar_id} missing from free/busy response"))?;

        // Google reports per-calendar failures (e.g. notFound) alongside an empty busy list
        if let Some(err) = calendar.errors.first() {
            anyhow::bail!(
                "free/busy unavailable for {calendar_id}: {} ({})",
                err.reason,
                err.domain
            );
        }

        Ok(calendar.busy)
    }

    async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> anyhow::Result<String> {
        let mut url = self.endpoint(&["calendars", calendar_id, "events"])?;
        url.query_pairs_mut().append_pair("sendUpdates", "all");

        let timezone = event.start.timezone().name().to_string();
        let attendees: Vec<_> = event
            .attendees
            .iter()
            .map(|email| json!({ "email": email }))
            .collect();

        let body = json!({
            "summary": event.summary,
            "description": event.description,
            "start": { "dateTime": rfc3339(&event.start), "timeZone": timezone },
            "end": { "dateTime": rfc3339(&event.end), "timeZone": timezone },
            "attendees": attendees,
        });

        let resp = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("failed to call Google events API")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Google events error ({status}): {text}");
        }

        let created: CreatedEvent = resp
            .json()
            .await
            .context("failed to parse Google events response")?;

        Ok(created.id)
    }
}
