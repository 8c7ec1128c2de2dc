//! Handler for the remaining-time endpoint.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;

use crate::api::dto::remaining_time::RemainingTimeResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Reports how long a short link has left.
///
/// # Endpoint
///
/// `GET /api/remaining-time/{code}`
///
/// Expired and unknown codes both have no time left and answer 410 Gone.
/// This endpoint never evicts.
pub async fn remaining_time_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<RemainingTimeResponse>, AppError> {
    let remaining = state.link_service.remaining_lifetime(&code).await?;
    let remaining_millis = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);

    if remaining_millis == 0 {
        return Err(AppError::gone(
            "Short link has expired or does not exist",
            json!({ "shortCode": code }),
        ));
    }

    Ok(Json(RemainingTimeResponse {
        short_code: code,
        remaining_millis,
    }))
}
