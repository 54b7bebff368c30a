use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::Contact;

/// Inbound booking request. Callers come from several voice/webhook platforms,
/// so each field accepts a handful of key spellings and loosely-typed values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    #[serde(
        default,
        alias = "Date",
        alias = "appointment_date",
        alias = "date_requested",
        deserialize_with = "lenient_string"
    )]
    pub date: Option<String>,

    #[serde(
        default,
        alias = "Time",
        alias = "appointment_time",
        alias = "time_requested",
        deserialize_with = "lenient_string"
    )]
    pub time: Option<String>,

    #[serde(
        default,
        rename = "durationMinutes",
        alias = "duration",
        alias = "duration_minutes",
        alias = "appointment_duration",
        deserialize_with = "lenient_string"
    )]
    pub duration: Option<String>,

    #[serde(
        default,
        rename = "customerName",
        alias = "customer_name",
        alias = "customer name",
        alias = "Customer Name",
        deserialize_with = "lenient_string"
    )]
    pub customer_name: Option<String>,

    #[serde(
        default,
        rename = "customerEmail",
        alias = "customer_email",
        alias = "customer email",
        alias = "Customer Email",
        deserialize_with = "lenient_string"
    )]
    pub customer_email: Option<String>,

    #[serde(
        default,
        rename = "customerPhone",
        alias = "customer_phone",
        alias = "customer phone",
        alias = "Customer Phone",
        deserialize_with = "lenient_string"
    )]
    pub customer_phone: Option<String>,

    #[serde(
        default,
        rename = "callTimestamp",
        alias = "call_timestamp",
        deserialize_with = "lenient_string"
    )]
    pub call_timestamp: Option<String>,

    #[serde(
        default,
        rename = "autoBook",
        alias = "auto_book",
        deserialize_with = "lenient_bool"
    )]
    pub auto_book: bool,
}

impl BookingRequest {
    pub fn contact(&self) -> Contact {
        Contact {
            name: self.customer_name.clone(),
            email: self.customer_email.clone(),
            phone: self.customer_phone.clone(),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        _ => false,
    })
}
