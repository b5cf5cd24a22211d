//! Webhook payload parser.
//!
//! Parses raw webhook JSON into a typed [`ParsedDelivery`]. The parser is
//! deliberately tolerant: unknown event types (and tag operations) return
//! `Ok(None)` so the endpoint can acknowledge them without dispatching,
//! while malformed payloads of known types are errors.

use serde::Deserialize;
use thiserror::Error;

use crate::types::InstallationId;

use super::events::{Commit, EventKind};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload carries no installation, so the event cannot be routed.
    #[error("payload has no installation")]
    MissingInstallation,
}

/// A successfully parsed delivery: the owning installation plus the event
/// shape. Host attribution happens later, at the route layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDelivery {
    pub installation: InstallationId,
    pub kind: EventKind,
}

/// Parses a webhook payload into a typed delivery.
///
/// # Arguments
///
/// * `event_type` - The value of the `X-GitHub-Event` header
/// * `payload` - The raw JSON payload bytes
///
/// # Returns
///
/// * `Ok(Some(delivery))` - a known, routable event
/// * `Ok(None)` - an event the bridge ignores (unknown type, tag operations)
/// * `Err(e)` - malformed payload for a known event type
pub fn parse_delivery(event_type: &str, payload: &[u8]) -> Result<Option<ParsedDelivery>, ParseError> {
    match event_type {
        "push" => parse_push(payload).map(Some),
        "create" => parse_create(payload),
        _ => Ok(None),
    }
}

// Raw payload structures. Optional fields are validated explicitly after
// deserialization so the error names the actual problem.

#[derive(Debug, Deserialize)]
struct RawInstallation {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawPushPayload {
    /// Full git ref, e.g. `refs/heads/feature/JRA-123`.
    #[serde(rename = "ref")]
    git_ref: String,
    #[serde(default)]
    commits: Vec<RawCommit>,
    installation: Option<RawInstallation>,
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    id: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawCreatePayload {
    /// The created ref's name (already short, no `refs/` prefix).
    #[serde(rename = "ref")]
    git_ref: String,
    ref_type: String,
    installation: Option<RawInstallation>,
}

fn installation_id(raw: Option<RawInstallation>) -> Result<InstallationId, ParseError> {
    raw.map(|i| InstallationId(i.id))
        .ok_or(ParseError::MissingInstallation)
}

fn parse_push(payload: &[u8]) -> Result<ParsedDelivery, ParseError> {
    let raw: RawPushPayload = serde_json::from_slice(payload)?;
    let installation = installation_id(raw.installation)?;

    // Tags also arrive as pushes; the commit messages still count, but the
    // ref name only names a branch when it lives under refs/heads/.
    let branch = raw
        .git_ref
        .strip_prefix("refs/heads/")
        .unwrap_or("")
        .to_string();

    let commits = raw
        .commits
        .into_iter()
        .map(|c| Commit {
            sha: c.id,
            message: c.message,
        })
        .collect();

    Ok(ParsedDelivery {
        installation,
        kind: EventKind::Push { branch, commits },
    })
}

fn parse_create(payload: &[u8]) -> Result<Option<ParsedDelivery>, ParseError> {
    let raw: RawCreatePayload = serde_json::from_slice(payload)?;

    if raw.ref_type != "branch" {
        return Ok(None);
    }

    Ok(Some(ParsedDelivery {
        installation: installation_id(raw.installation)?,
        kind: EventKind::BranchCreated {
            branch: raw.git_ref,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_push_with_commits() {
        let payload = serde_json::json!({
            "ref": "refs/heads/feature/JRA-123",
            "commits": [
                { "id": "a1b2c3", "message": "JRA-123 fix the thing" },
                { "id": "d4e5f6", "message": "tidy up" }
            ],
            "installation": { "id": 42 }
        });

        let parsed = parse_delivery("push", payload.to_string().as_bytes())
            .unwrap()
            .unwrap();

        assert_eq!(parsed.installation, InstallationId(42));
        match parsed.kind {
            EventKind::Push { branch, commits } => {
                assert_eq!(branch, "feature/JRA-123");
                assert_eq!(commits.len(), 2);
                assert_eq!(commits[0].message, "JRA-123 fix the thing");
            }
            other => panic!("expected push, got {other:?}"),
        }
    }

    #[test]
    fn push_without_commits_defaults_to_empty() {
        let payload = serde_json::json!({
            "ref": "refs/heads/main",
            "installation": { "id": 1 }
        });

        let parsed = parse_delivery("push", payload.to_string().as_bytes())
            .unwrap()
            .unwrap();
        assert!(matches!(
            parsed.kind,
            EventKind::Push { ref commits, .. } if commits.is_empty()
        ));
    }

    #[test]
    fn tag_push_keeps_commits_but_no_branch() {
        let payload = serde_json::json!({
            "ref": "refs/tags/v1.0.0",
            "commits": [{ "id": "a", "message": "TBD-9 release" }],
            "installation": { "id": 1 }
        });

        let parsed = parse_delivery("push", payload.to_string().as_bytes())
            .unwrap()
            .unwrap();
        match parsed.kind {
            EventKind::Push { branch, commits } => {
                assert!(branch.is_empty());
                assert_eq!(commits.len(), 1);
            }
            other => panic!("expected push, got {other:?}"),
        }
    }

    #[test]
    fn parses_branch_create() {
        let payload = serde_json::json!({
            "ref": "TES-4-shiny",
            "ref_type": "branch",
            "installation": { "id": 7 }
        });

        let parsed = parse_delivery("create", payload.to_string().as_bytes())
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed.kind,
            EventKind::BranchCreated {
                branch: "TES-4-shiny".to_string()
            }
        );
    }

    #[test]
    fn tag_create_is_ignored() {
        let payload = serde_json::json!({
            "ref": "v1.0.0",
            "ref_type": "tag",
            "installation": { "id": 7 }
        });

        assert!(
            parse_delivery("create", payload.to_string().as_bytes())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn unknown_event_type_is_ignored() {
        assert!(parse_delivery("pull_request", b"{}").unwrap().is_none());
    }

    #[test]
    fn missing_installation_is_an_error() {
        let payload = serde_json::json!({ "ref": "refs/heads/main" });
        assert!(matches!(
            parse_delivery("push", payload.to_string().as_bytes()),
            Err(ParseError::MissingInstallation)
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            parse_delivery("push", b"{not json"),
            Err(ParseError::Json(_))
        ));
    }
}
