//! Domain layer containing business entities and logic.
//!
//! This module defines the short-link lifecycle model independent of
//! infrastructure concerns.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`time`] - Clock abstraction used for every expiration decision
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on infrastructure or presentation layers
//! - Repository traits define contracts implemented by infrastructure layer
//! - Business logic is encapsulated in services (see [`crate::application::services`])
//!
//! # Record Lifecycle
//!
//! 1. [`entities::NewLink`] is inserted by the link service on a shorten request
//! 2. The live [`entities::Link`] is only mutated by click increments
//! 3. Once `expires_at` is reached, the first lookup or sweep to notice evicts it
//! 4. Every eviction appends exactly one [`entities::DeletionEntry`]

pub mod entities;
pub mod repositories;
pub mod time;
