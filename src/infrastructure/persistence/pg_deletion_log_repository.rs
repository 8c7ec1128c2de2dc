//! PostgreSQL implementation of the deletion log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::DeletionEntry;
use crate::domain::repositories::DeletionLogRepository;
use crate::error::AppError;

#[derive(FromRow)]
pub(super) struct DeletionRow {
    id: i64,
    code: String,
    target_url: String,
    expired_at: DateTime<Utc>,
    deleted_at: DateTime<Utc>,
}

impl From<DeletionRow> for DeletionEntry {
    fn from(r: DeletionRow) -> Self {
        DeletionEntry {
            id: r.id,
            code: r.code,
            target_url: r.target_url,
            expired_at: r.expired_at,
            deleted_at: r.deleted_at,
        }
    }
}

/// PostgreSQL repository for the `deletion_log` table.
///
/// Ids come from a `BIGSERIAL` sequence. Evictions insert their entries from
/// [`super::PgLinkRepository`] in the same statement as the delete.
pub struct PgDeletionLogRepository {
    pool: Arc<PgPool>,
}

impl PgDeletionLogRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeletionLogRepository for PgDeletionLogRepository {
    async fn list_recent(
        &self,
        code: Option<String>,
        limit: usize,
    ) -> Result<Vec<DeletionEntry>, AppError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows: Vec<DeletionRow> = sqlx::query_as(
            r#"
            SELECT id, code, target_url, expired_at, deleted_at
            FROM deletion_log
            WHERE ($1::text IS NULL OR code = $1)
            ORDER BY id DESC
            LIMIT $2
            "#,
        )
        .bind(code)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(DeletionEntry::from).collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deletion_log")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }
}
