//! Tracker-side project records with occurrence counters.

use serde::{Deserialize, Serialize};

use super::ids::{ProjectKey, TrackerHost};

/// A tracker project observed in inbound events, with a popularity counter.
///
/// `(key, host)` uniquely identifies a project. Rows are created lazily on the
/// first observed reference and incremented on every subsequent one; the
/// counter never decreases. Removal happens only via host-level teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// The project key (uppercase prefix of its issue keys).
    pub key: ProjectKey,

    /// The destination tracker host the project belongs to.
    pub host: TrackerHost,

    /// How many times issue keys of this project have been observed.
    pub occurrences: u64,
}

impl Project {
    /// Creates a fresh project row with a zero counter.
    pub fn new(key: ProjectKey, host: TrackerHost) -> Self {
        Project {
            key,
            host,
            occurrences: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_project_starts_at_zero() {
        let project = Project::new(
            ProjectKey::normalized("jra"),
            TrackerHost::from("https://a.example.net"),
        );
        assert_eq!(project.occurrences, 0);
        assert_eq!(project.key.as_str(), "JRA");
    }

    #[test]
    fn serde_roundtrip() {
        let project = Project {
            key: ProjectKey::normalized("TBD"),
            host: TrackerHost::from("https://b.example.net"),
            occurrences: 9,
        };
        let json = serde_json::to_string(&project).unwrap();
        let parsed: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(project, parsed);
    }
}
