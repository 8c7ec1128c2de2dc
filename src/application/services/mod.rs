//! Business logic services for the application layer.

pub mod eviction_service;
pub mod expiry_sweeper;
pub mod link_service;

pub use eviction_service::{EvictionCause, EvictionService};
pub use expiry_sweeper::{ExpirySweeper, SweepReport, run_expiry_sweeper};
pub use link_service::{CreateLink, LinkPolicy, LinkService, Resolution};
