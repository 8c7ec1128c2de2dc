//! Link entity representing a short code mapped to a target URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A short-link record as held by the record store.
///
/// `code` and `created_at` never change after creation. `expires_at` is
/// always populated; the default policy is applied before insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub click_count: i64,
    pub domain_prefix: String,
}

impl Link {
    /// Creates a new Link instance.
    pub fn new(
        code: String,
        target_url: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        click_count: i64,
        domain_prefix: String,
    ) -> Self {
        Self {
            code,
            target_url,
            created_at,
            expires_at,
            click_count,
            domain_prefix,
        }
    }

    /// Returns true once the deadline has been reached.
    ///
    /// A link whose `expires_at` equals `now` is already expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time left before the deadline, clamped to zero.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Externally visible short URL (`domain_prefix/code`).
    pub fn short_url(&self) -> String {
        format!("{}/{}", self.domain_prefix.trim_end_matches('/'), self.code)
    }
}

/// Input data for creating a new link.
///
/// Every field is already resolved: the code is chosen, the domain prefix and
/// deadline defaults applied. The store sets `click_count` to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub code: String,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub domain_prefix: String,
}

impl NewLink {
    /// The record this input becomes once stored.
    pub fn into_link(self) -> Link {
        Link::new(
            self.code,
            self.target_url,
            self.created_at,
            self.expires_at,
            0,
            self.domain_prefix,
        )
    }
}
