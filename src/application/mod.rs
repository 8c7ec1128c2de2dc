//! Application layer services implementing business logic.
//!
//! This layer orchestrates domain operations by coordinating repository calls
//! and the expiration policy. Services consume repository traits and provide
//! a clean API for HTTP handlers, the background sweeper and the admin CLI.
//!
//! # Available Services
//!
//! - [`services::link_service::LinkService`] - Link creation, resolution and click accounting
//! - [`services::eviction_service::EvictionService`] - The one eviction procedure (delete + audit)
//! - [`services::expiry_sweeper::ExpirySweeper`] - Periodic scan evicting expired links

pub mod services;
