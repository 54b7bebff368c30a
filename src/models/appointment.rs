use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The anchor instant for one request, already projected into the business timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    pub instant: DateTime<Tz>,
    pub timezone: Tz,
}

impl CallContext {
    pub fn new(instant: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            instant: instant.with_timezone(&timezone),
            timezone,
        }
    }

    /// Calendar date of the anchor instant in the business timezone.
    pub fn today(&self) -> NaiveDate {
        self.instant.date_naive()
    }
}

/// How a date phrase was resolved. Only `ExplicitIso` dates are exempt from
/// past-window correction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    ExplicitIso,
    NaturalLanguage,
    PatternFallback,
}

impl DateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateSource::ExplicitIso => "explicit_iso",
            DateSource::NaturalLanguage => "natural_language",
            DateSource::PatternFallback => "pattern_fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateResolution {
    pub date: NaiveDate,
    pub source: DateSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

/// A concrete appointment slot. `end` is always after `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub timezone: Tz,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}
