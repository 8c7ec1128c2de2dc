//! The single eviction procedure shared by lookups, alias reuse and the sweeper.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::entities::{DeletionEntry, Link};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// What noticed the expired record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionCause {
    /// A resolve found the record past its deadline.
    Lookup,
    /// A create found its custom alias held by an expired record.
    Create,
    /// The periodic sweep found it.
    Sweep,
}

impl EvictionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionCause::Lookup => "lookup",
            EvictionCause::Create => "create",
            EvictionCause::Sweep => "sweep",
        }
    }
}

impl fmt::Display for EvictionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Removes expired records together with their audit entries.
///
/// The delete and the audit append are a single store operation
/// ([`LinkRepository::evict_expired`]), conditioned on the record still being
/// present and expired. Concurrent evictions of one record therefore produce
/// exactly one entry, and a failed eviction leaves both the record and the
/// log untouched, so it can simply be retried.
pub struct EvictionService<L: LinkRepository + ?Sized> {
    link_repository: Arc<L>,
}

impl<L: LinkRepository + ?Sized> EvictionService<L> {
    /// Creates a new eviction service.
    pub fn new(link_repository: Arc<L>) -> Self {
        Self { link_repository }
    }

    /// Evicts `link` if it is still stored and expired at `now`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(entry))` if this call removed the record
    /// - `Ok(None)` if another path already removed it, or it is not expired
    ///
    /// # Errors
    ///
    /// Propagates store errors. Nothing has been deleted when an error is
    /// returned.
    pub async fn evict(
        &self,
        link: &Link,
        now: DateTime<Utc>,
        cause: EvictionCause,
    ) -> Result<Option<DeletionEntry>, AppError> {
        let Some(entry) = self.link_repository.evict_expired(&link.code, now).await? else {
            debug!(code = %link.code, %cause, "Link already evicted");
            return Ok(None);
        };

        info!(
            code = %entry.code,
            expired_at = %entry.expired_at,
            audit_id = entry.id,
            %cause,
            "Evicted expired link"
        );
        metrics::counter!("links_evicted_total", "cause" => cause.as_str()).increment(1);

        Ok(Some(entry))
    }
}
