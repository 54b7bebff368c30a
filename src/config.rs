use std::env;
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;

pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub business_timezone: Tz,
    pub calendar_id: String,
    pub google_access_token: String,
    pub calendar_api_base: String,
    pub calendar_timeout: Duration,
    pub api_secret: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let tz_name = env::var("BUSINESS_TIMEZONE")
            .or_else(|_| env::var("TIMEZONE"))
            .unwrap_or_else(|_| "America/New_York".to_string());
        let business_timezone = parse_timezone(&tz_name)?;

        Ok(Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            business_timezone,
            calendar_id: env::var("GOOGLE_CALENDAR_ID")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "primary".to_string()),
            google_access_token: env::var("GOOGLE_ACCESS_TOKEN").unwrap_or_default(),
            calendar_api_base: env::var("GOOGLE_CALENDAR_API_BASE")
                .unwrap_or_else(|_| DEFAULT_CALENDAR_API_BASE.to_string()),
            calendar_timeout: Duration::from_secs(
                env::var("CALENDAR_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(10),
            ),
            api_secret: env::var("API_SECRET").unwrap_or_default(),
        })
    }
}

pub fn parse_timezone(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid business timezone: {name}"))
}
