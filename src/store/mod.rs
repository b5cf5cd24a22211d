//! Persistence boundary for subscriptions and project counters.
//!
//! The core consumes storage through the narrow [`BridgeStore`] trait and
//! never performs joins or complex queries. Two backends ship with the crate:
//!
//! - [`MemoryStore`] - in-process maps, used by tests and as the default
//!   backend when no data directory is configured.
//! - [`FileStore`] - a durable JSON document written with the
//!   write-temp/fsync/rename pattern.
//!
//! Counter increments are serialized *inside* the store (each backend holds its
//! own lock across find-or-create-and-increment), so callers never observe a
//! read-modify-write window.

use std::io;

use thiserror::Error;

use crate::types::{InstallationId, Project, ProjectKey, Subscription, SyncStatus, TrackerHost};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors surfaced by store operations.
///
/// Stores never retry internally; retry policy belongs to callers.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// IO error reaching the underlying storage.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error (corrupt or incompatible data).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored document was written by an incompatible schema.
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },

    /// The store is unreachable or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// The narrow persistence capability the bridge core consumes.
///
/// Implementations must serialize [`record_occurrence`](Self::record_occurrence)
/// per row so the increment is atomic at the store layer.
pub trait BridgeStore: Send + Sync {
    /// Returns every subscription registered for a destination host, in the
    /// store's natural order. The core imposes no re-ordering.
    fn subscriptions_for_host(&self, host: &TrackerHost) -> Result<Vec<Subscription>>;

    /// Returns every subscription owned by an installation.
    ///
    /// Used by the route layer to resolve which hosts an inbound event fans
    /// out to.
    fn subscriptions_for_installation(
        &self,
        installation: InstallationId,
    ) -> Result<Vec<Subscription>>;

    /// Creates a subscription linking an installation to a host.
    ///
    /// Idempotent: re-registering an existing link returns the existing row.
    fn create_subscription(
        &self,
        installation: InstallationId,
        host: &TrackerHost,
    ) -> Result<Subscription>;

    /// Removes the subscription linking an installation to a host.
    ///
    /// Returns `true` if a row was removed, `false` if none existed.
    fn remove_subscription(&self, installation: InstallationId, host: &TrackerHost)
    -> Result<bool>;

    /// Records the outcome of a sync attempt on a subscription.
    ///
    /// A no-op if the subscription no longer exists (it may have been
    /// disconnected while a dispatch was in flight).
    fn set_sync_status(
        &self,
        installation: InstallationId,
        host: &TrackerHost,
        status: SyncStatus,
    ) -> Result<()>;

    /// Finds or creates the `(key, host)` project row and atomically increments
    /// its occurrence counter by one, returning the post-increment state.
    fn record_occurrence(&self, key: &ProjectKey, host: &TrackerHost) -> Result<Project>;

    /// Returns every project row for a host, in the store's natural order.
    fn projects_for_host(&self, host: &TrackerHost) -> Result<Vec<Project>>;

    /// Deletes every project row for a host, returning how many were removed.
    ///
    /// Best-effort: not required to be atomic across rows. A failure partway
    /// through is reported, but rows already deleted stay deleted.
    fn remove_projects_for_host(&self, host: &TrackerHost) -> Result<usize>;
}
