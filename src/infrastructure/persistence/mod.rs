//! Record store and deletion log implementations.
//!
//! Concrete implementations of the domain repository traits for each
//! supported backend.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] / [`PgDeletionLogRepository`] - PostgreSQL via SQLx
//! - [`RedisLinkRepository`] / [`RedisDeletionLogRepository`] - Redis hashes, Lua scripts and a list
//! - [`MemoryLinkRepository`] / [`MemoryDeletionLogRepository`] - in-process, for development and tests

pub mod memory;
pub mod pg_deletion_log_repository;
pub mod pg_link_repository;
pub mod redis_deletion_log_repository;
pub mod redis_link_repository;

pub use memory::{MemoryDeletionLogRepository, MemoryLinkRepository};
pub use pg_deletion_log_repository::PgDeletionLogRepository;
pub use pg_link_repository::PgLinkRepository;
pub use redis_deletion_log_repository::RedisDeletionLogRepository;
pub use redis_link_repository::RedisLinkRepository;
