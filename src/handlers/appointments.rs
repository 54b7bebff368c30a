use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use tracing::Instrument;

use crate::errors::AppError;
use crate::models::{BookingRequest, BookingResponse};
use crate::services::booking;
use crate::state::AppState;

/// Transport-level origin timestamp; wins over `callTimestamp` in the body.
pub const CALL_TIMESTAMP_HEADER: &str = "x-call-timestamp";

fn check_auth(headers: &HeaderMap, expected_secret: &str) -> Result<(), AppError> {
    // No secret configured (dev mode)
    if expected_secret.is_empty() {
        return Ok(());
    }

    let api_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match api_key.or(bearer) {
        Some(provided) if provided == expected_secret => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

// POST /api/appointments
pub async fn check_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<BookingResponse>, AppError> {
    check_auth(&headers, &state.config.api_secret)?;
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    Ok(Json(run(&state, &headers, request).await))
}

// POST /api/appointments/book
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<BookingResponse>, AppError> {
    check_auth(&headers, &state.config.api_secret)?;
    let Json(mut request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    request.auto_book = true;

    Ok(Json(run(&state, &headers, request).await))
}

async fn run(state: &AppState, headers: &HeaderMap, request: BookingRequest) -> BookingResponse {
    let request_id = uuid::Uuid::new_v4();
    let header_timestamp = headers
        .get(CALL_TIMESTAMP_HEADER)
        .and_then(|v| v.to_str().ok());

    let span = tracing::info_span!("appointment", %request_id);
    booking::process_request(state, &request, header_timestamp, Utc::now())
        .instrument(span)
        .await
}
