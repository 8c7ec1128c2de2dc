//! Handler for short URL redirect.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;

use crate::application::services::Resolution;
use crate::error::AppError;
use crate::state::AppState;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// # Request Flow
///
/// 1. Resolve the code; an expired link is evicted on the spot
/// 2. Count the click on the live link
/// 3. Return 302 Found
///
/// A click that races with an eviction is dropped; the redirect still
/// succeeds because the link was live when it was resolved.
///
/// # Errors
///
/// - 404 Not Found if the code never existed or was already evicted
/// - 410 Gone if this lookup found the link expired
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let link = match state.link_service.resolve_link(&code).await? {
        Resolution::Live(link) => link,
        Resolution::Expired => {
            return Err(AppError::gone(
                "Short link has expired",
                json!({ "shortCode": code }),
            ));
        }
        Resolution::Missing => {
            return Err(AppError::not_found(
                "Short link not found",
                json!({ "shortCode": code }),
            ));
        }
    };

    state.link_service.record_click(&link).await?;
    metrics::counter!("redirects_total").increment(1);

    Ok((StatusCode::FOUND, [(header::LOCATION, link.target_url)]))
}
