//! Repository trait for short-link records.

use crate::domain::entities::{DeletionEntry, Link, NewLink};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Record store for short links, keyed by code.
///
/// Each operation is individually atomic. Operations that change a record are
/// conditioned on its state at `now`, so an expired record is never counted
/// and a deleted record is never written back.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::RedisLinkRepository`] - Redis implementation
/// - [`crate::infrastructure::persistence::MemoryLinkRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Inserts a new record if no record holds its code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if any record, live or not yet evicted,
    /// already uses the code.
    ///
    /// Returns [`AppError::Unavailable`] or [`AppError::Internal`] on store errors.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a record by code regardless of its expiration.
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError>;

    /// Returns true if a record with this code exists and is live at `now`.
    async fn exists_live(&self, code: &str, now: DateTime<Utc>) -> Result<bool, AppError>;

    /// Adds one click to a record that is still live at `now`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(count))` with the new counter value
    /// - `Ok(None)` if the record is gone or expired; nothing is written
    async fn increment_clicks(&self, code: &str, now: DateTime<Utc>)
    -> Result<Option<i64>, AppError>;

    /// Removes a record expired at `now` and appends its deletion entry, as
    /// one store operation.
    ///
    /// Either both happen or neither does. The entry copies the record's
    /// code, target and deadline, with `now` as the deletion time.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(entry))` with the appended entry if this call evicted it
    /// - `Ok(None)` if it was already gone or is still live; nothing is written
    async fn evict_expired(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DeletionEntry>, AppError>;

    /// Returns every stored record. May be a full scan.
    async fn list_all(&self) -> Result<Vec<Link>, AppError>;

    /// Returns every record expired at `now`.
    ///
    /// Backends with an index on the deadline should override this.
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Link>, AppError> {
        let links = self.list_all().await?;
        Ok(links
            .into_iter()
            .filter(|link| link.is_expired_at(now))
            .collect())
    }

    /// Counts stored records, including expired ones not yet evicted.
    async fn count(&self) -> Result<i64, AppError>;

    /// Checks whether the backend is reachable.
    async fn health_check(&self) -> bool;
}
