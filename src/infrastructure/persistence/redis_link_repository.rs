//! Redis implementation of link repository.
//!
//! Each record is a hash at `{prefix}link:{code}` with timestamps stored as
//! epoch milliseconds. Insert, conditional increment and eviction run as Lua
//! scripts so the check and the write are atomic on the server. Eviction
//! deletes the hash and pushes its audit entry onto the deletion log list in
//! the same script.
//!
//! Every record also carries a native `PEXPIREAT` set a grace period past
//! `max(expires_at, created_at)`. Redis reaps records the application paths
//! missed, without an audit entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

use super::redis_deletion_log_repository::deletion_log_key;
use crate::domain::entities::{DeletionEntry, Link, NewDeletionEntry, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

const SCAN_BATCH: usize = 100;

const CREATE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1],
    'code', ARGV[1],
    'target_url', ARGV[2],
    'created_at', ARGV[3],
    'expires_at', ARGV[4],
    'click_count', 0,
    'domain_prefix', ARGV[5])
redis.call('PEXPIREAT', KEYS[1], ARGV[6])
return 1
"#;

const INCREMENT_SCRIPT: &str = r#"
local expires_at = redis.call('HGET', KEYS[1], 'expires_at')
if not expires_at or tonumber(expires_at) <= tonumber(ARGV[1]) then
    return -1
end
return redis.call('HINCRBY', KEYS[1], 'click_count', 1)
"#;

const EVICT_SCRIPT: &str = r#"
local stored = redis.call('HMGET', KEYS[1], 'expires_at', 'created_at', 'target_url')
if not stored[1] or tonumber(stored[1]) > tonumber(ARGV[1]) then
    return -1
end
if stored[1] ~= ARGV[2] or stored[2] ~= ARGV[3] or stored[3] ~= ARGV[4] then
    return -1
end
redis.call('DEL', KEYS[1])
return redis.call('RPUSH', KEYS[2], ARGV[5])
"#;

/// Redis repository for link records.
pub struct RedisLinkRepository {
    conn: ConnectionManager,
    key_prefix: String,
    ttl_grace_ms: i64,
    create_script: Script,
    increment_script: Script,
    evict_script: Script,
    deletion_log_key: String,
}

impl RedisLinkRepository {
    /// Creates a repository over an established connection.
    ///
    /// `ttl_grace_seconds` is added to each record's deadline to get the
    /// native Redis expiry.
    pub fn new(
        conn: ConnectionManager,
        key_prefix: impl Into<String>,
        ttl_grace_seconds: u64,
    ) -> Self {
        let ttl_grace_ms = ttl_grace_seconds.saturating_mul(1000);
        let key_prefix = key_prefix.into();

        Self {
            conn,
            deletion_log_key: deletion_log_key(&key_prefix),
            key_prefix,
            ttl_grace_ms: i64::try_from(ttl_grace_ms).unwrap_or(i64::MAX),
            create_script: Script::new(CREATE_SCRIPT),
            increment_script: Script::new(INCREMENT_SCRIPT),
            evict_script: Script::new(EVICT_SCRIPT),
        }
    }

    fn build_key(&self, code: &str) -> String {
        format!("{}link:{}", self.key_prefix, code)
    }

    async fn scan_keys(&self) -> Result<Vec<String>, AppError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}link:*", self.key_prefix);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }
}

/// Native expiry of a record, in epoch milliseconds.
///
/// Anchored at `created_at` when the deadline is already in the past, so a
/// record created expired stays visible until a lookup or sweep evicts it.
fn native_expiry_millis(new_link: &NewLink, grace_ms: i64) -> i64 {
    new_link
        .expires_at
        .max(new_link.created_at)
        .timestamp_millis()
        .saturating_add(grace_ms)
}

fn field<'a>(hash: &'a HashMap<String, String>, name: &str) -> Result<&'a str, AppError> {
    hash.get(name).map(String::as_str).ok_or_else(|| {
        AppError::internal(
            "Stored link is missing a field",
            json!({ "field": name }),
        )
    })
}

fn millis_field(hash: &HashMap<String, String>, name: &str) -> Result<DateTime<Utc>, AppError> {
    field(hash, name)?
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| {
            AppError::internal("Stored link has a malformed timestamp", json!({ "field": name }))
        })
}

/// Rebuilds a link from its hash; an empty hash means no record.
fn link_from_hash(hash: HashMap<String, String>) -> Result<Option<Link>, AppError> {
    if hash.is_empty() {
        return Ok(None);
    }

    let click_count = field(&hash, "click_count")?.parse::<i64>().map_err(|_| {
        AppError::internal(
            "Stored link has a malformed click count",
            json!({ "field": "click_count" }),
        )
    })?;

    Ok(Some(Link::new(
        field(&hash, "code")?.to_string(),
        field(&hash, "target_url")?.to_string(),
        millis_field(&hash, "created_at")?,
        millis_field(&hash, "expires_at")?,
        click_count,
        field(&hash, "domain_prefix")?.to_string(),
    )))
}

#[async_trait]
impl LinkRepository for RedisLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut conn = self.conn.clone();
        let expires_ms = new_link.expires_at.timestamp_millis();

        let inserted: i64 = self
            .create_script
            .key(self.build_key(&new_link.code))
            .arg(&new_link.code)
            .arg(&new_link.target_url)
            .arg(new_link.created_at.timestamp_millis())
            .arg(expires_ms)
            .arg(&new_link.domain_prefix)
            .arg(native_expiry_millis(&new_link, self.ttl_grace_ms))
            .invoke_async(&mut conn)
            .await?;

        if inserted == 0 {
            return Err(AppError::conflict(
                "Short code already exists",
                json!({ "code": new_link.code }),
            ));
        }

        Ok(new_link.into_link())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = conn.hgetall(self.build_key(code)).await?;
        link_from_hash(hash)
    }

    async fn exists_live(&self, code: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let expires_at: Option<i64> = conn.hget(self.build_key(code), "expires_at").await?;

        Ok(expires_at.is_some_and(|ms| ms > now.timestamp_millis()))
    }

    async fn increment_clicks(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<i64>, AppError> {
        let mut conn = self.conn.clone();

        let count: i64 = self
            .increment_script
            .key(self.build_key(code))
            .arg(now.timestamp_millis())
            .invoke_async(&mut conn)
            .await?;

        Ok((count >= 0).then_some(count))
    }

    async fn evict_expired(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DeletionEntry>, AppError> {
        let Some(link) = self.find_by_code(code).await? else {
            return Ok(None);
        };
        if !link.is_expired_at(now) {
            return Ok(None);
        }

        let entry = NewDeletionEntry::for_evicted(&link, now);
        let payload = serde_json::to_string(&entry)?;

        // The script re-checks the record it read, so a concurrent eviction
        // or a re-created code leaves both keys untouched.
        let mut conn = self.conn.clone();
        let position: i64 = self
            .evict_script
            .key(self.build_key(code))
            .key(&self.deletion_log_key)
            .arg(now.timestamp_millis())
            .arg(link.expires_at.timestamp_millis())
            .arg(link.created_at.timestamp_millis())
            .arg(&link.target_url)
            .arg(payload)
            .invoke_async(&mut conn)
            .await?;

        Ok((position > 0).then(|| entry.with_id(position)))
    }

    async fn list_all(&self) -> Result<Vec<Link>, AppError> {
        let keys = self.scan_keys().await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for key in &keys {
            pipe.hgetall(key);
        }

        let mut conn = self.conn.clone();
        let hashes: Vec<HashMap<String, String>> = pipe.query_async(&mut conn).await?;

        let mut links = Vec::with_capacity(hashes.len());
        for hash in hashes {
            // Keys removed between SCAN and HGETALL come back empty.
            if let Some(link) = link_from_hash(hash)? {
                links.push(link);
            }
        }

        debug!(scanned = keys.len(), found = links.len(), "Listed links from Redis");

        Ok(links)
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.scan_keys().await?.len() as i64)
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.conn.clone();
        conn.ping::<()>().await.is_ok()
    }
}
