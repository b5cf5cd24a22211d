//! In-memory store backend.
//!
//! Backs tests and secret-free local runs. All state lives behind a single
//! mutex; holding it across find-or-create-and-increment makes the counter
//! update atomic at the store layer.

use std::sync::{Mutex, PoisonError};

use crate::types::{InstallationId, Project, ProjectKey, Subscription, SyncStatus, TrackerHost};

use super::{BridgeStore, Result};

#[derive(Debug, Default)]
struct Tables {
    /// Insertion order is the store's natural return order.
    subscriptions: Vec<Subscription>,
    projects: Vec<Project>,
}

/// An in-process [`BridgeStore`] with no durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        // A poisoned mutex means a panic mid-mutation; the tables themselves
        // are still structurally valid, so recover rather than propagate.
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }
}

impl BridgeStore for MemoryStore {
    fn subscriptions_for_host(&self, host: &TrackerHost) -> Result<Vec<Subscription>> {
        self.with_tables(|t| {
            Ok(t.subscriptions
                .iter()
                .filter(|s| &s.host == host)
                .cloned()
                .collect())
        })
    }

    fn subscriptions_for_installation(
        &self,
        installation: InstallationId,
    ) -> Result<Vec<Subscription>> {
        self.with_tables(|t| {
            Ok(t.subscriptions
                .iter()
                .filter(|s| s.installation == installation)
                .cloned()
                .collect())
        })
    }

    fn create_subscription(
        &self,
        installation: InstallationId,
        host: &TrackerHost,
    ) -> Result<Subscription> {
        self.with_tables(|t| {
            if let Some(existing) = t
                .subscriptions
                .iter()
                .find(|s| s.installation == installation && &s.host == host)
            {
                return Ok(existing.clone());
            }
            let subscription = Subscription::new(installation, host.clone());
            t.subscriptions.push(subscription.clone());
            Ok(subscription)
        })
    }

    fn remove_subscription(
        &self,
        installation: InstallationId,
        host: &TrackerHost,
    ) -> Result<bool> {
        self.with_tables(|t| {
            let before = t.subscriptions.len();
            t.subscriptions
                .retain(|s| !(s.installation == installation && &s.host == host));
            Ok(t.subscriptions.len() < before)
        })
    }

    fn set_sync_status(
        &self,
        installation: InstallationId,
        host: &TrackerHost,
        status: SyncStatus,
    ) -> Result<()> {
        self.with_tables(|t| {
            if let Some(subscription) = t
                .subscriptions
                .iter_mut()
                .find(|s| s.installation == installation && &s.host == host)
            {
                subscription.mark_sync(status);
            }
            Ok(())
        })
    }

    fn record_occurrence(&self, key: &ProjectKey, host: &TrackerHost) -> Result<Project> {
        self.with_tables(|t| {
            if let Some(project) = t
                .projects
                .iter_mut()
                .find(|p| &p.key == key && &p.host == host)
            {
                project.occurrences += 1;
                return Ok(project.clone());
            }
            let mut project = Project::new(key.clone(), host.clone());
            project.occurrences = 1;
            t.projects.push(project.clone());
            Ok(project)
        })
    }

    fn projects_for_host(&self, host: &TrackerHost) -> Result<Vec<Project>> {
        self.with_tables(|t| {
            Ok(t.projects
                .iter()
                .filter(|p| &p.host == host)
                .cloned()
                .collect())
        })
    }

    fn remove_projects_for_host(&self, host: &TrackerHost) -> Result<usize> {
        self.with_tables(|t| {
            let before = t.projects.len();
            t.projects.retain(|p| &p.host != host);
            Ok(before - t.projects.len())
        })
    }
}
