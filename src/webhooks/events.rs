//! Typed source-platform events.
//!
//! Only the event shapes the bridge reacts to are represented: pushes (commit
//! messages) and branch creation (branch names). Everything else is ignored at
//! the parser, not here.

use serde::{Deserialize, Serialize};

use crate::types::{DeliveryId, InstallationId, TrackerHost};

/// One commit carried by a push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// The commit SHA as reported by the source platform.
    pub sha: String,

    /// The full commit message.
    pub message: String,
}

/// The shape of an inbound event, without routing context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Commits were pushed to a branch.
    Push {
        /// The short branch name (without the `refs/heads/` prefix).
        branch: String,
        commits: Vec<Commit>,
    },

    /// A branch was created.
    BranchCreated {
        /// The new branch's name.
        branch: String,
    },
}

/// An inbound event attributed to a destination tracker host.
///
/// The route layer produces one `SourceEvent` per destination host an
/// installation fans out to; the pipeline consumes them one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEvent {
    /// The destination tracker host this event is attributed to.
    pub host: TrackerHost,

    /// The installation the event originated from.
    pub installation: InstallationId,

    /// The webhook delivery that carried the event.
    pub delivery: DeliveryId,

    /// The event shape.
    pub kind: EventKind,
}

impl SourceEvent {
    /// Returns the free-text fields the extractor scans for issue keys:
    /// the branch name plus, for pushes, every commit message.
    pub fn text_fields(&self) -> Vec<&str> {
        match &self.kind {
            EventKind::Push { branch, commits } => {
                let mut fields = Vec::with_capacity(commits.len() + 1);
                fields.push(branch.as_str());
                fields.extend(commits.iter().map(|c| c.message.as_str()));
                fields
            }
            EventKind::BranchCreated { branch } => vec![branch.as_str()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind) -> SourceEvent {
        SourceEvent {
            host: TrackerHost::from("https://a.example.net"),
            installation: InstallationId(1),
            delivery: DeliveryId::new("d-1"),
            kind,
        }
    }

    #[test]
    fn push_text_fields_cover_branch_and_messages() {
        let event = event(EventKind::Push {
            branch: "feature/JRA-1".to_string(),
            commits: vec![
                Commit {
                    sha: "a".repeat(40),
                    message: "JRA-2 first".to_string(),
                },
                Commit {
                    sha: "b".repeat(40),
                    message: "JRA-3 second".to_string(),
                },
            ],
        });

        assert_eq!(
            event.text_fields(),
            vec!["feature/JRA-1", "JRA-2 first", "JRA-3 second"]
        );
    }

    #[test]
    fn branch_created_text_fields_is_branch_name() {
        let event = event(EventKind::BranchCreated {
            branch: "TES-4-shiny".to_string(),
        });
        assert_eq!(event.text_fields(), vec!["TES-4-shiny"]);
    }

    #[test]
    fn serde_roundtrip() {
        let event = event(EventKind::Push {
            branch: "main".to_string(),
            commits: vec![],
        });
        let json = serde_json::to_string(&event).unwrap();
        let parsed: SourceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
