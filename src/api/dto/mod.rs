//! Data Transfer Objects for API requests and responses.
//!
//! All DTOs use Serde for JSON serialization/deserialization and validator
//! for input validation. Public JSON fields are camelCase.

pub mod health;
pub mod remaining_time;
pub mod shorten;
