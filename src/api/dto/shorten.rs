//! DTOs for link shortening endpoint.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use crate::domain::entities::Link;

/// Compiled regex for custom alias validation. Empty means "generate one".
static CUSTOM_ALIAS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]*$").unwrap());

/// Request to shorten one URL.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShortenRequest {
    /// The destination URL. Never checked for reachability.
    #[validate(url(message = "Invalid URL format"))]
    pub original_url: String,

    /// Optional custom short code; empty or missing generates one.
    #[validate(length(max = 64, message = "Custom alias must be at most 64 characters"))]
    #[validate(regex(
        path = "*CUSTOM_ALIAS_REGEX",
        message = "Custom alias can only contain letters, digits, hyphens and underscores"
    ))]
    pub custom_alias: Option<String>,

    /// Optional domain prefix for the short URL (absolute http/https URL).
    pub custom_domain: Option<String>,

    /// Optional deadline (RFC 3339). Defaults to seven days after creation.
    pub expires_at: Option<DateTime<Utc>>,
}

/// The created link.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub click_count: i64,
    pub custom_domain: String,
}

impl From<Link> for ShortenResponse {
    fn from(link: Link) -> Self {
        Self {
            short_url: link.short_url(),
            short_code: link.code,
            original_url: link.target_url,
            created_at: link.created_at,
            expires_at: link.expires_at,
            click_count: link.click_count,
            custom_domain: link.domain_prefix,
        }
    }
}
