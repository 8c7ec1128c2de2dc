//! Handler for link shortening endpoint.

use axum::{Json, extract::State};
use serde_json::json;
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::application::services::CreateLink;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link.
///
/// # Endpoint
///
/// `POST /api/shorten`
///
/// # Request Body
///
/// ```json
/// {
///   "originalUrl": "https://example.com/very/long/path",
///   "customAlias": "promo1",                 // optional
///   "customDomain": "https://sho.rt",        // optional
///   "expiresAt": "2030-01-01T00:00:00Z"      // optional, default now + 7 days
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "shortCode": "promo1",
///   "shortUrl": "https://sho.rt/promo1",
///   "originalUrl": "https://example.com/very/long/path",
///   "createdAt": "2025-01-01T00:00:00Z",
///   "expiresAt": "2030-01-01T00:00:00Z",
///   "clickCount": 0,
///   "customDomain": "https://sho.rt"
/// }
/// ```
///
/// # Errors
///
/// - 400 Bad Request if the URL, alias or domain is malformed
/// - 409 Conflict if the alias is held by a live link
/// - 503 Service Unavailable if the store cannot be reached
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    payload.validate()?;

    let custom_domain = payload
        .custom_domain
        .map(|domain| domain.trim().to_string())
        .filter(|domain| !domain.is_empty());

    if let Some(ref domain) = custom_domain {
        validate_custom_domain(domain)?;
    }

    let request = CreateLink {
        target_url: payload.original_url,
        custom_alias: payload.custom_alias,
        domain_prefix: custom_domain,
        expires_at: payload.expires_at,
    };

    let link = state.link_service.create_link(request).await?;

    Ok(Json(ShortenResponse::from(link)))
}

/// A custom domain must be an absolute http(s) URL.
fn validate_custom_domain(domain: &str) -> Result<(), AppError> {
    match url::Url::parse(domain) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(AppError::bad_request(
            "Custom domain must be an absolute http or https URL",
            json!({ "customDomain": domain }),
        )),
    }
}
