use serde::Serialize;

use super::AppointmentWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeededField {
    Date,
    Time,
    Duration,
}

impl NeededField {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeededField::Date => "date",
            NeededField::Time => "time",
            NeededField::Duration => "duration",
        }
    }
}

/// Which inputs could not be turned into a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub needed: Vec<NeededField>,
}

impl ParseFailure {
    pub fn needs(&self, field: NeededField) -> bool {
        self.needed.contains(&field)
    }

    /// `date`, `time`, `date_and_time`, ...
    pub fn need_key(&self) -> String {
        self.needed
            .iter()
            .map(NeededField::as_str)
            .collect::<Vec<_>>()
            .join("_and_")
    }
}

/// Terminal value of the booking pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    Booked { event_id: String },
    /// Free, but booking was not requested.
    Available,
    SlotBusy,
    ParseFailure(ParseFailure),
    PastWindow,
    AvailabilityCheckFailed { cause: String },
    CreateFailed { cause: String },
}

impl BookingOutcome {
    pub fn is_free(&self) -> bool {
        matches!(
            self,
            BookingOutcome::Booked { .. }
                | BookingOutcome::Available
                | BookingOutcome::CreateFailed { .. }
        )
    }

    pub fn event_id(&self) -> Option<&str> {
        match self {
            BookingOutcome::Booked { event_id } => Some(event_id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingOutcome::Booked { .. } => "booked",
            BookingOutcome::Available => "available",
            BookingOutcome::SlotBusy => "slot_busy",
            BookingOutcome::ParseFailure(_) => "parse_failure",
            BookingOutcome::PastWindow => "past_window",
            BookingOutcome::AvailabilityCheckFailed { .. } => "availability_check_failed",
            BookingOutcome::CreateFailed { .. } => "create_failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    pub date: String,
    pub time24: String,
    pub time12: String,
    pub iso: String,
    pub duration_minutes: i64,
    pub timezone: String,
}

impl From<&AppointmentWindow> for AppointmentSummary {
    fn from(window: &AppointmentWindow) -> Self {
        Self {
            date: window.start.format("%Y-%m-%d").to_string(),
            time24: window.start.format("%H:%M").to_string(),
            time12: window.start.format("%-I:%M %P").to_string(),
            iso: window.start.to_rfc3339(),
            duration_minutes: window.duration_minutes,
            timezone: window.timezone.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub is_free: bool,
    pub event_id: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment: Option<AppointmentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub need: Option<String>,
}
