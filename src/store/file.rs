//! Durable JSON-file store backend.
//!
//! The whole store is one schema-versioned JSON document, rewritten atomically
//! on every mutation:
//!
//! 1. Write to `bridge.json.tmp`
//! 2. fsync the temp file
//! 3. Rename to `bridge.json`
//! 4. fsync the directory
//!
//! Readers therefore always see either the old or the new document, never a
//! partial write. The document is mirrored in memory behind a mutex; holding
//! the mutex across mutate-and-persist keeps counter increments atomic at the
//! store layer.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::{InstallationId, Project, ProjectKey, Subscription, SyncStatus, TrackerHost};

use super::{BridgeStore, PersistenceError, Result};

/// Current document schema version. Increment on breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// File name of the store document inside the data directory.
const DOCUMENT_NAME: &str = "bridge.json";

/// The persisted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BridgeDocument {
    /// Schema version for forward-compatible migrations.
    schema_version: u32,

    /// When the document was last rewritten.
    updated_at: DateTime<Utc>,

    /// Insertion order is the store's natural return order.
    subscriptions: Vec<Subscription>,
    projects: Vec<Project>,
}

impl BridgeDocument {
    fn empty() -> Self {
        BridgeDocument {
            schema_version: SCHEMA_VERSION,
            updated_at: Utc::now(),
            subscriptions: Vec::new(),
            projects: Vec::new(),
        }
    }
}

/// A [`BridgeStore`] persisted as a single JSON document on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    document: Mutex<BridgeDocument>,
}

impl FileStore {
    /// Opens (or initializes) the store document under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing document cannot be read or was written
    /// by an incompatible schema version.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        let path = data_dir.join(DOCUMENT_NAME);

        let document = if path.exists() {
            let bytes = std::fs::read(&path)?;
            let document: BridgeDocument = serde_json::from_slice(&bytes)?;
            if document.schema_version != SCHEMA_VERSION {
                return Err(PersistenceError::SchemaMismatch {
                    expected: SCHEMA_VERSION,
                    got: document.schema_version,
                });
            }
            info!(
                path = %path.display(),
                subscriptions = document.subscriptions.len(),
                projects = document.projects.len(),
                "Loaded store document"
            );
            document
        } else {
            debug!(path = %path.display(), "Initializing empty store document");
            BridgeDocument::empty()
        };

        Ok(FileStore {
            path,
            document: Mutex::new(document),
        })
    }

    /// Runs a read-only closure against the in-memory document.
    fn read<T>(&self, f: impl FnOnce(&BridgeDocument) -> T) -> T {
        let document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        f(&document)
    }

    /// Runs a mutation under the lock and persists the result atomically.
    ///
    /// If the write fails the in-memory mutation is still visible; the next
    /// successful mutation re-persists the full document, so no data is lost
    /// unless the process dies first.
    fn mutate<T>(&self, f: impl FnOnce(&mut BridgeDocument) -> T) -> Result<T> {
        let mut document = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        let value = f(&mut document);
        document.updated_at = Utc::now();
        save_document_atomic(&self.path, &document)?;
        Ok(value)
    }
}

/// Writes the document with the write-temp/fsync/rename/fsync-dir sequence.
fn save_document_atomic(path: &Path, document: &BridgeDocument) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(document)?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)?;

    // Directory entry must also be durable, or the rename can be lost on
    // power failure even though the file contents were synced.
    if let Some(parent) = path.parent() {
        fsync_dir(parent)?;
    }

    Ok(())
}

/// Syncs a directory so renames and creations inside it survive a crash.
fn fsync_dir(dir: &Path) -> std::io::Result<()> {
    let handle = File::open(dir)?;
    handle.sync_all()
}

impl BridgeStore for FileStore {
    fn subscriptions_for_host(&self, host: &TrackerHost) -> Result<Vec<Subscription>> {
        Ok(self.read(|d| {
            d.subscriptions
                .iter()
                .filter(|s| &s.host == host)
                .cloned()
                .collect()
        }))
    }

    fn subscriptions_for_installation(
        &self,
        installation: InstallationId,
    ) -> Result<Vec<Subscription>> {
        Ok(self.read(|d| {
            d.subscriptions
                .iter()
                .filter(|s| s.installation == installation)
                .cloned()
                .collect()
        }))
    }

    fn create_subscription(
        &self,
        installation: InstallationId,
        host: &TrackerHost,
    ) -> Result<Subscription> {
        self.mutate(|d| {
            if let Some(existing) = d
                .subscriptions
                .iter()
                .find(|s| s.installation == installation && &s.host == host)
            {
                return existing.clone();
            }
            let subscription = Subscription::new(installation, host.clone());
            d.subscriptions.push(subscription.clone());
            subscription
        })
    }

    fn remove_subscription(
        &self,
        installation: InstallationId,
        host: &TrackerHost,
    ) -> Result<bool> {
        self.mutate(|d| {
            let before = d.subscriptions.len();
            d.subscriptions
                .retain(|s| !(s.installation == installation && &s.host == host));
            d.subscriptions.len() < before
        })
    }

    fn set_sync_status(
        &self,
        installation: InstallationId,
        host: &TrackerHost,
        status: SyncStatus,
    ) -> Result<()> {
        self.mutate(|d| {
            if let Some(subscription) = d
                .subscriptions
                .iter_mut()
                .find(|s| s.installation == installation && &s.host == host)
            {
                subscription.mark_sync(status);
            }
        })
    }

    fn record_occurrence(&self, key: &ProjectKey, host: &TrackerHost) -> Result<Project> {
        self.mutate(|d| {
            if let Some(project) = d
                .projects
                .iter_mut()
                .find(|p| &p.key == key && &p.host == host)
            {
                project.occurrences += 1;
                return project.clone();
            }
            let mut project = Project::new(key.clone(), host.clone());
            project.occurrences = 1;
            d.projects.push(project.clone());
            project
        })
    }

    fn projects_for_host(&self, host: &TrackerHost) -> Result<Vec<Project>> {
        Ok(self.read(|d| {
            d.projects
                .iter()
                .filter(|p| &p.host == host)
                .cloned()
                .collect()
        }))
    }

    fn remove_projects_for_host(&self, host: &TrackerHost) -> Result<usize> {
        self.mutate(|d| {
            let before = d.projects.len();
            d.projects.retain(|p| &p.host != host);
            before - d.projects.len()
        })
    }
}
