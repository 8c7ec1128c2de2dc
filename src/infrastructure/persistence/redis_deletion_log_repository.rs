//! Redis implementation of the deletion log.
//!
//! Entries are JSON documents appended to one list. An entry's id is its
//! 1-based position, which is what `RPUSH` returns. Evictions push their
//! entries from [`super::RedisLinkRepository`], inside the eviction script.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::domain::entities::{DeletionEntry, NewDeletionEntry};
use crate::domain::repositories::DeletionLogRepository;
use crate::error::AppError;

/// Key of the deletion log list under `key_prefix`.
pub(super) fn deletion_log_key(key_prefix: &str) -> String {
    format!("{}deletion_log", key_prefix)
}

/// Redis repository for the deletion log list.
pub struct RedisDeletionLogRepository {
    conn: ConnectionManager,
    key: String,
}

impl RedisDeletionLogRepository {
    pub fn new(conn: ConnectionManager, key_prefix: &str) -> Self {
        Self {
            conn,
            key: deletion_log_key(key_prefix),
        }
    }
}

#[async_trait]
impl DeletionLogRepository for RedisDeletionLogRepository {
    async fn list_recent(
        &self,
        code: Option<String>,
        limit: usize,
    ) -> Result<Vec<DeletionEntry>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();

        let Some(code) = code else {
            let start = isize::try_from(limit).map_or(isize::MIN, |n| -n);
            let (length, raw): (i64, Vec<String>) = redis::pipe()
                .atomic()
                .llen(&self.key)
                .lrange(&self.key, start, -1)
                .query_async(&mut conn)
                .await?;

            let first_id = length - raw.len() as i64 + 1;
            let mut entries = Vec::with_capacity(raw.len());
            for (offset, payload) in raw.iter().enumerate().rev() {
                let entry: NewDeletionEntry = serde_json::from_str(payload)?;
                entries.push(entry.with_id(first_id + offset as i64));
            }

            return Ok(entries);
        };

        // No index by code; filter the whole list.
        let raw: Vec<String> = conn.lrange(&self.key, 0, -1).await?;

        let mut entries = Vec::new();
        for (index, payload) in raw.iter().enumerate().rev() {
            if entries.len() >= limit {
                break;
            }

            let entry: NewDeletionEntry = serde_json::from_str(payload)?;
            if entry.code != code {
                continue;
            }

            entries.push(entry.with_id(index as i64 + 1));
        }

        Ok(entries)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let mut conn = self.conn.clone();
        let length: i64 = conn.llen(&self.key).await?;
        Ok(length)
    }
}
