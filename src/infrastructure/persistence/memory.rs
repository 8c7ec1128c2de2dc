//! In-process implementations of the record store and the deletion log.
//!
//! Every operation takes the write lock for its whole duration, which makes
//! check-and-insert and conditional increment atomic. Eviction holds the
//! record lock while it appends to the log, so the delete and its audit entry
//! are observed together. Contents are lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::{DeletionEntry, Link, NewDeletionEntry, NewLink};
use crate::domain::repositories::{DeletionLogRepository, LinkRepository};
use crate::error::AppError;

/// Record store backed by a `HashMap`, writing evictions to `deletion_log`.
pub struct MemoryLinkRepository {
    links: RwLock<HashMap<String, Link>>,
    deletion_log: Arc<MemoryDeletionLogRepository>,
}

impl MemoryLinkRepository {
    pub fn new(deletion_log: Arc<MemoryDeletionLogRepository>) -> Self {
        Self {
            links: RwLock::new(HashMap::new()),
            deletion_log,
        }
    }
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut links = self.links.write().await;

        if links.contains_key(&new_link.code) {
            return Err(AppError::conflict(
                "Short code already exists",
                json!({ "code": new_link.code }),
            ));
        }

        let link = new_link.into_link();
        links.insert(link.code.clone(), link.clone());

        Ok(link)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        Ok(self.links.read().await.get(code).cloned())
    }

    async fn exists_live(&self, code: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        Ok(self
            .links
            .read()
            .await
            .get(code)
            .is_some_and(|link| !link.is_expired_at(now)))
    }

    async fn increment_clicks(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, AppError> {
        let mut links = self.links.write().await;

        Ok(links
            .get_mut(code)
            .filter(|link| !link.is_expired_at(now))
            .map(|link| {
                link.click_count += 1;
                link.click_count
            }))
    }

    async fn evict_expired(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DeletionEntry>, AppError> {
        let mut links = self.links.write().await;

        let Some(link) = links.get(code).filter(|link| link.is_expired_at(now)) else {
            return Ok(None);
        };
        let entry = NewDeletionEntry::for_evicted(link, now);

        let entry = self.deletion_log.push(entry).await;
        links.remove(code);

        Ok(Some(entry))
    }

    async fn list_all(&self) -> Result<Vec<Link>, AppError> {
        Ok(self.links.read().await.values().cloned().collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.links.read().await.len() as i64)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Deletion log backed by a `Vec`.
#[derive(Default)]
pub struct MemoryDeletionLogRepository {
    entries: RwLock<Vec<DeletionEntry>>,
}

impl MemoryDeletionLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn push(&self, entry: NewDeletionEntry) -> DeletionEntry {
        let mut entries = self.entries.write().await;
        let entry = entry.with_id(entries.len() as i64 + 1);
        entries.push(entry.clone());
        entry
    }
}

#[async_trait]
impl DeletionLogRepository for MemoryDeletionLogRepository {
    async fn list_recent(
        &self,
        code: Option<String>,
        limit: usize,
    ) -> Result<Vec<DeletionEntry>, AppError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|entry| code.as_deref().is_none_or(|c| entry.code == c))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.entries.read().await.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_link(code: &str, expires_at: DateTime<Utc>) -> NewLink {
        NewLink {
            code: code.to_string(),
            target_url: "https://example.com".to_string(),
            created_at: expires_at - Duration::days(7),
            expires_at,
            domain_prefix: "http://localhost:8080".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = MemoryLinkRepository::new(Arc::default());
        let now = Utc::now();

        let link = repo.create(new_link("abc123", now + Duration::days(1))).await.unwrap();

        assert_eq!(link.click_count, 0);
        assert_eq!(repo.find_by_code("abc123").await.unwrap(), Some(link));
        assert!(repo.find_by_code("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let repo = MemoryLinkRepository::new(Arc::default());
        let now = Utc::now();

        repo.create(new_link("abc123", now + Duration::days(1))).await.unwrap();
        let result = repo.create(new_link("abc123", now + Duration::days(2))).await;

        assert!(matches!(result, Err(AppError::Conflict { .. })));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exists_live_ignores_expired() {
        let repo = MemoryLinkRepository::new(Arc::default());
        let now = Utc::now();

        repo.create(new_link("live01", now + Duration::hours(1))).await.unwrap();
        repo.create(new_link("dead01", now - Duration::hours(1))).await.unwrap();

        assert!(repo.exists_live("live01", now).await.unwrap());
        assert!(!repo.exists_live("dead01", now).await.unwrap());
        assert!(!repo.exists_live("none01", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_increment_clicks_only_while_live() {
        let repo = MemoryLinkRepository::new(Arc::default());
        let now = Utc::now();

        repo.create(new_link("abc123", now + Duration::hours(1))).await.unwrap();

        assert_eq!(repo.increment_clicks("abc123", now).await.unwrap(), Some(1));
        assert_eq!(repo.increment_clicks("abc123", now).await.unwrap(), Some(2));

        let later = now + Duration::hours(2);
        assert_eq!(repo.increment_clicks("abc123", later).await.unwrap(), None);
        assert_eq!(repo.find_by_code("abc123").await.unwrap().unwrap().click_count, 2);
    }

    #[tokio::test]
    async fn test_increment_clicks_never_recreates() {
        let repo = MemoryLinkRepository::new(Arc::default());

        assert_eq!(repo.increment_clicks("ghost1", Utc::now()).await.unwrap(), None);
        assert!(repo.find_by_code("ghost1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict_expired_is_conditional_and_idempotent() {
        let log = Arc::new(MemoryDeletionLogRepository::new());
        let repo = MemoryLinkRepository::new(log.clone());
        let now = Utc::now();

        repo.create(new_link("live01", now + Duration::hours(1))).await.unwrap();
        let dead = repo.create(new_link("dead01", now - Duration::hours(1))).await.unwrap();

        assert!(repo.evict_expired("live01", now).await.unwrap().is_none());
        assert!(repo.find_by_code("live01").await.unwrap().is_some());

        let entry = repo.evict_expired("dead01", now).await.unwrap().unwrap();
        assert_eq!(entry.id, 1);
        assert_eq!(entry.code, "dead01");
        assert_eq!(entry.expired_at, dead.expires_at);
        assert_eq!(entry.deleted_at, now);
        assert!(repo.find_by_code("dead01").await.unwrap().is_none());

        assert!(repo.evict_expired("dead01", now).await.unwrap().is_none());
        assert!(repo.evict_expired("none01", now).await.unwrap().is_none());
        assert_eq!(log.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_evictions_write_one_entry() {
        let log = Arc::new(MemoryDeletionLogRepository::new());
        let repo = Arc::new(MemoryLinkRepository::new(log.clone()));
        let now = Utc::now();

        repo.create(new_link("dead01", now - Duration::hours(1))).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.evict_expired("dead01", now).await.unwrap() })
            })
            .collect();

        let mut evicted = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                evicted += 1;
            }
        }

        assert_eq!(evicted, 1);
        assert_eq!(log.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_expired_default_filter() {
        let repo = MemoryLinkRepository::new(Arc::default());
        let now = Utc::now();

        repo.create(new_link("live01", now + Duration::hours(1))).await.unwrap();
        repo.create(new_link("dead01", now - Duration::hours(1))).await.unwrap();
        repo.create(new_link("dead02", now)).await.unwrap();

        let mut expired: Vec<String> = repo
            .list_expired(now)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.code)
            .collect();
        expired.sort();

        assert_eq!(expired, vec!["dead01", "dead02"]);
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_deletion_log_push_and_list() {
        let log = MemoryDeletionLogRepository::new();
        let now = Utc::now();

        for code in ["a", "b", "a"] {
            log.push(NewDeletionEntry {
                code: code.to_string(),
                target_url: "https://example.com".to_string(),
                expired_at: now,
                deleted_at: now,
            })
            .await;
        }

        let all = log.list_recent(None, 10).await.unwrap();
        assert_eq!(all.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 2, 1]);

        let only_a = log.list_recent(Some("a".to_string()), 10).await.unwrap();
        assert_eq!(only_a.len(), 2);
        assert!(only_a.iter().all(|e| e.code == "a"));

        assert_eq!(log.list_recent(None, 1).await.unwrap().len(), 1);
        assert_eq!(log.count().await.unwrap(), 3);
    }
}
