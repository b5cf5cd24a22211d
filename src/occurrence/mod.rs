//! Per-project occurrence tracking.
//!
//! Every issue key observed in an inbound event counts one occurrence against
//! its `(project key, host)` row. The counter is a popularity signal for the
//! destination tracker, not a delivery gate: callers treat failures here as
//! telemetry loss, never as a reason to skip dispatch.

use std::sync::Arc;

use tracing::debug;

use crate::store::{BridgeStore, PersistenceError};
use crate::types::{Project, ProjectKey, TrackerHost};

/// Records project occurrences through the store's atomic increment.
#[derive(Clone)]
pub struct OccurrenceTracker {
    store: Arc<dyn BridgeStore>,
}

impl OccurrenceTracker {
    pub fn new(store: Arc<dyn BridgeStore>) -> Self {
        OccurrenceTracker { store }
    }

    /// Finds-or-creates the `(key, host)` project row and increments its
    /// counter by one, returning the post-increment state.
    ///
    /// The increment happens inside the store, serialized per row; this layer
    /// never reads then writes. Does not retry: a [`PersistenceError`] is
    /// surfaced as-is and retry policy belongs to the caller.
    pub fn record(
        &self,
        key: &ProjectKey,
        host: &TrackerHost,
    ) -> Result<Project, PersistenceError> {
        let project = self.store.record_occurrence(key, host)?;
        debug!(
            project_key = %project.key,
            host = %project.host,
            occurrences = project.occurrences,
            "Recorded project occurrence"
        );
        Ok(project)
    }

    /// Deletes every project row for a host. Used only on full host teardown.
    ///
    /// Best-effort: a failure partway through is reported, but rows already
    /// deleted stay deleted.
    pub fn remove_all_for_host(&self, host: &TrackerHost) -> Result<usize, PersistenceError> {
        let removed = self.store.remove_projects_for_host(host)?;
        debug!(host = %host, removed, "Removed projects for host");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn tracker() -> (OccurrenceTracker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (OccurrenceTracker::new(store.clone()), store)
    }

    #[test]
    fn record_counts_zero_to_one_to_two() {
        let (tracker, store) = tracker();
        let key = ProjectKey::normalized("jra");
        let host = TrackerHost::from("https://a.example.net");

        assert_eq!(tracker.record(&key, &host).unwrap().occurrences, 1);
        assert_eq!(tracker.record(&key, &host).unwrap().occurrences, 2);

        // Never a duplicate row
        assert_eq!(store.projects_for_host(&host).unwrap().len(), 1);
    }

    #[test]
    fn remove_all_for_host_clears_rows() {
        let (tracker, store) = tracker();
        let host = TrackerHost::from("https://a.example.net");
        tracker
            .record(&ProjectKey::normalized("JRA"), &host)
            .unwrap();
        tracker
            .record(&ProjectKey::normalized("TBD"), &host)
            .unwrap();

        assert_eq!(tracker.remove_all_for_host(&host).unwrap(), 2);
        assert!(store.projects_for_host(&host).unwrap().is_empty());
    }
}
