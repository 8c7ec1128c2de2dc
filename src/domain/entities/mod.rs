//! Core domain entities representing the business data model.
//!
//! # Entity Types
//!
//! - [`Link`] - A live short-link record
//! - [`DeletionEntry`] - An audit record written when a link is evicted
//!
//! # Design Pattern
//!
//! Entities follow the "New Type" pattern with separate structs for creation:
//! `NewLink` and `NewDeletionEntry` carry what the caller decides, the stored
//! types add what the store assigns.

pub mod deletion_entry;
pub mod link;

pub use deletion_entry::{DeletionEntry, NewDeletionEntry};
pub use link::{Link, NewLink};
