use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use bookline::config::AppConfig;
use bookline::handlers;
use bookline::services::calendar::google::GoogleCalendarProvider;
use bookline::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;

    if config.google_access_token.is_empty() {
        tracing::warn!("GOOGLE_ACCESS_TOKEN not set, calendar calls will be rejected");
    }
    if config.api_secret.is_empty() {
        tracing::warn!("API_SECRET not set, requests are not authenticated");
    }

    tracing::info!(
        timezone = config.business_timezone.name(),
        calendar_id = %config.calendar_id,
        timeout_secs = config.calendar_timeout.as_secs(),
        "using Google Calendar provider"
    );
    let calendar = GoogleCalendarProvider::new(
        config.calendar_api_base.clone(),
        config.google_access_token.clone(),
        config.calendar_timeout,
    )?;

    let state = Arc::new(AppState::new(config.clone(), Box::new(calendar)));
    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
