//! Repository trait for the deletion audit log.

use crate::domain::entities::DeletionEntry;
use crate::error::AppError;
use async_trait::async_trait;

/// Read side of the append-only log of link evictions.
///
/// Entries are written only by [`super::LinkRepository::evict_expired`],
/// together with the delete they record. They are never updated or removed;
/// ids increase monotonically in append order.
#[async_trait]
pub trait DeletionLogRepository: Send + Sync {
    /// Lists entries newest first, optionally restricted to one code.
    async fn list_recent(
        &self,
        code: Option<String>,
        limit: usize,
    ) -> Result<Vec<DeletionEntry>, AppError>;

    /// Counts all entries.
    async fn count(&self) -> Result<i64, AppError>;
}
