//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use super::pg_deletion_log_repository::DeletionRow;
use crate::domain::entities::{DeletionEntry, Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const LINK_COLUMNS: &str = "code, target_url, created_at, expires_at, click_count, domain_prefix";

#[derive(FromRow)]
struct LinkRow {
    code: String,
    target_url: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    click_count: i64,
    domain_prefix: String,
}

impl From<LinkRow> for Link {
    fn from(r: LinkRow) -> Self {
        Link::new(
            r.code,
            r.target_url,
            r.created_at,
            r.expires_at,
            r.click_count,
            r.domain_prefix,
        )
    }
}

/// PostgreSQL repository for link records.
///
/// Conditional writes are single statements, so each is atomic without an
/// explicit transaction. Eviction deletes the record and inserts its
/// `deletion_log` row in one statement.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let row: Option<LinkRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO links (code, target_url, created_at, expires_at, click_count, domain_prefix)
            VALUES ($1, $2, $3, $4, 0, $5)
            ON CONFLICT (code) DO NOTHING
            RETURNING {LINK_COLUMNS}
            "#
        ))
        .bind(&new_link.code)
        .bind(&new_link.target_url)
        .bind(new_link.created_at)
        .bind(new_link.expires_at)
        .bind(&new_link.domain_prefix)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(Link::from).ok_or_else(|| {
            AppError::conflict(
                "Short code already exists",
                json!({ "code": new_link.code }),
            )
        })
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let row: Option<LinkRow> =
            sqlx::query_as(&format!("SELECT {LINK_COLUMNS} FROM links WHERE code = $1"))
                .bind(code)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(row.map(Link::from))
    }

    async fn exists_live(&self, code: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM links WHERE code = $1 AND expires_at > $2)",
        )
        .bind(code)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn increment_clicks(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, AppError> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE links
            SET click_count = click_count + 1
            WHERE code = $1 AND expires_at > $2
            RETURNING click_count
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn evict_expired(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DeletionEntry>, AppError> {
        let row: Option<DeletionRow> = sqlx::query_as(
            r#"
            WITH evicted AS (
                DELETE FROM links
                WHERE code = $1 AND expires_at <= $2
                RETURNING code, target_url, expires_at
            )
            INSERT INTO deletion_log (code, target_url, expired_at, deleted_at)
            SELECT code, target_url, expires_at, $2 FROM evicted
            RETURNING id, code, target_url, expired_at, deleted_at
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(DeletionEntry::from))
    }

    async fn list_all(&self) -> Result<Vec<Link>, AppError> {
        let rows: Vec<LinkRow> = sqlx::query_as(&format!(
            "SELECT {LINK_COLUMNS} FROM links ORDER BY created_at"
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Link>, AppError> {
        let rows: Vec<LinkRow> = sqlx::query_as(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE expires_at <= $1 ORDER BY expires_at"
        ))
        .bind(now)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Link::from).collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
