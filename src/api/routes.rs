//! API route configuration.

use crate::api::handlers::{remaining_time_handler, shorten_handler};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// All API routes. No authentication is applied.
///
/// # Endpoints
///
/// - `POST /shorten`               - Create a short link
/// - `GET  /remaining-time/{code}` - Milliseconds left before a link expires
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/remaining-time/{code}", get(remaining_time_handler))
}
