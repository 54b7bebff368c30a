pub mod appointments;

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/appointments", post(appointments::check_appointment))
        .route("/api/appointments/book", post(appointments::book_appointment))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
