//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete record stores and wiring the one selected by configuration.
//!
//! # Modules
//!
//! - [`persistence`] - PostgreSQL, Redis and in-memory repository implementations

pub mod persistence;

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::domain::repositories::{DeletionLogRepository, LinkRepository};
use persistence::{
    MemoryDeletionLogRepository, MemoryLinkRepository, PgDeletionLogRepository, PgLinkRepository,
    RedisDeletionLogRepository, RedisLinkRepository,
};

/// The record store and deletion log of one backend.
#[derive(Clone)]
pub struct Store {
    pub links: Arc<dyn LinkRepository>,
    pub deletion_log: Arc<dyn DeletionLogRepository>,
}

impl Store {
    /// In-process store; contents are lost on restart.
    pub fn in_memory() -> Self {
        let deletion_log = Arc::new(MemoryDeletionLogRepository::new());
        Self {
            links: Arc::new(MemoryLinkRepository::new(deletion_log.clone())),
            deletion_log,
        }
    }
}

/// Connects to the backend selected by `STORAGE_BACKEND`.
///
/// For PostgreSQL the embedded migrations are applied before returning.
///
/// # Errors
///
/// Returns an error if the backend URL is missing, the connection cannot be
/// established, or migrations fail.
pub async fn connect_store(config: &Config) -> Result<Store> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;

            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
                .idle_timeout(Duration::from_secs(config.db_idle_timeout))
                .max_lifetime(Duration::from_secs(config.db_max_lifetime))
                .connect(database_url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            let pool = Arc::new(pool);
            Ok(Store {
                links: Arc::new(PgLinkRepository::new(pool.clone())),
                deletion_log: Arc::new(PgDeletionLogRepository::new(pool)),
            })
        }
        StorageBackend::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the redis backend")?;

            let conn = connect_redis(redis_url).await?;

            Ok(Store {
                links: Arc::new(RedisLinkRepository::new(
                    conn.clone(),
                    config.redis_key_prefix.clone(),
                    config.redis_ttl_grace_seconds,
                )),
                deletion_log: Arc::new(RedisDeletionLogRepository::new(
                    conn,
                    &config.redis_key_prefix,
                )),
            })
        }
        StorageBackend::Memory => {
            info!("Using in-memory store; records are lost on restart");
            Ok(Store::in_memory())
        }
    }
}

/// Opens a managed Redis connection and validates it with a PING.
async fn connect_redis(redis_url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

    let mut manager = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    redis::cmd("PING")
        .query_async::<()>(&mut manager)
        .await
        .context("Redis PING failed")?;

    info!("Connected to Redis");

    Ok(manager)
}
