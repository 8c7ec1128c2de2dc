//! DTO for the remaining-time endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingTimeResponse {
    pub short_code: String,
    /// Milliseconds until the link expires; always positive.
    pub remaining_millis: u64,
}
