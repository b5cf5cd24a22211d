//! Core domain types for the tracker bridge.
//!
//! This module contains the fundamental types used throughout the application,
//! designed to encode invariants via the type system.

pub mod ids;
pub mod project;
pub mod subscription;

// Re-export commonly used types at the module level
pub use ids::{DeliveryId, InstallationId, IssueKey, ProjectKey, TrackerHost};
pub use project::Project;
pub use subscription::{Subscription, SyncStatus};
