//! Repository trait definitions for the domain layer.
//!
//! These traits abstract the record store and the deletion audit log. They are
//! implemented by concrete backends in the infrastructure layer.
//!
//! # Architecture
//!
//! - Traits define the contract for data operations
//! - Implementations live in `crate::infrastructure::persistence`
//! - Mock implementations are auto-generated via `mockall` for testing
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Short-link records keyed by code
//! - [`DeletionLogRepository`] - Read side of the eviction audit trail
//!
//! # Testing
//!
//! See `tests/repository_*.rs` and the in-memory backend tests for usage examples.

pub mod deletion_log_repository;
pub mod link_repository;

pub use deletion_log_repository::DeletionLogRepository;
pub use link_repository::LinkRepository;

#[cfg(test)]
pub use link_repository::MockLinkRepository;
