//! Deletion audit entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Link;

/// An append-only audit record of one link eviction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionEntry {
    pub id: i64,
    pub code: String,
    pub target_url: String,
    pub expired_at: DateTime<Utc>,
    pub deleted_at: DateTime<Utc>,
}

/// Input data for appending to the deletion log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeletionEntry {
    pub code: String,
    pub target_url: String,
    pub expired_at: DateTime<Utc>,
    pub deleted_at: DateTime<Utc>,
}

impl NewDeletionEntry {
    /// Builds the audit record for a link removed at `deleted_at`.
    pub fn for_evicted(link: &Link, deleted_at: DateTime<Utc>) -> Self {
        Self {
            code: link.code.clone(),
            target_url: link.target_url.clone(),
            expired_at: link.expires_at,
            deleted_at,
        }
    }

    /// Attaches the identifier assigned by the log.
    pub fn with_id(self, id: i64) -> DeletionEntry {
        DeletionEntry {
            id,
            code: self.code,
            target_url: self.target_url,
            expired_at: self.expired_at,
            deleted_at: self.deleted_at,
        }
    }
}
