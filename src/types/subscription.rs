//! Subscription records linking installations to destination tracker hosts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{InstallationId, TrackerHost};

/// The synchronization status of a subscription.
///
/// Updated on every dispatch attempt: a subscription whose handler succeeded is
/// `Active`; one whose handler failed is `Failed` until a later attempt (or an
/// explicit resync) succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Created but never dispatched to.
    Pending,

    /// Last dispatch to this subscription succeeded.
    Active,

    /// Last dispatch to this subscription failed; a resync is warranted.
    Failed,
}

impl SyncStatus {
    /// Returns true if the last dispatch attempt failed.
    pub fn needs_resync(&self) -> bool {
        matches!(self, SyncStatus::Failed)
    }
}

/// A link from one source-platform installation to one destination tracker host.
///
/// A subscription belongs to exactly one installation. Multiple subscriptions
/// may share an installation (one installation fanning out to several
/// destination hosts), and multiple installations may subscribe to the same
/// host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// The owning installation.
    pub installation: InstallationId,

    /// The destination tracker host this subscription delivers to.
    pub host: TrackerHost,

    /// Outcome of the most recent dispatch attempt.
    pub sync_status: SyncStatus,

    /// When the subscription was created.
    pub created_at: DateTime<Utc>,

    /// When the subscription was last mutated (status change).
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Creates a new pending subscription stamped with the current time.
    pub fn new(installation: InstallationId, host: TrackerHost) -> Self {
        let now = Utc::now();
        Subscription {
            installation,
            host,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records the outcome of a sync attempt, bumping `updated_at`.
    pub fn mark_sync(&mut self, status: SyncStatus) {
        self.sync_status = status;
        self.updated_at = Utc::now();
    }
}
