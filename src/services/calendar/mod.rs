pub mod google;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::{AppointmentWindow, Contact};

/// An existing commitment reported by the calendar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    /// Half-open overlap: touching intervals do not conflict.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub summary: String,
    pub description: String,
    pub attendees: Vec<String>,
}

impl NewEvent {
    /// Event text is built from caller-supplied contact fields as plain text only.
    pub fn for_contact(window: &AppointmentWindow, contact: &Contact) -> Self {
        let name = non_empty(contact.name.as_deref());
        let email = non_empty(contact.email.as_deref());
        let phone = non_empty(contact.phone.as_deref());

        let summary = match name {
            Some(name) => format!("Appointment with {name}"),
            None => "Appointment".to_string(),
        };

        let description = format!(
            "Name: {}\nEmail: {}\nPhone: {}\nDuration: {} minutes\nBooked by phone assistant",
            name.unwrap_or("Not provided"),
            email.unwrap_or("Not provided"),
            phone.unwrap_or("Not provided"),
            window.duration_minutes,
        );

        Self {
            start: window.start,
            end: window.end,
            summary,
            description,
            attendees: email.map(|e| vec![e.to_string()]).unwrap_or_default(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Busy intervals on `calendar_id` intersecting `[start, end)`.
    async fn busy_intervals(
        &self,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<BusyInterval>>;

    /// Create the event and return its identifier.
    async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> anyhow::Result<String>;
}
