//! Destination-side client and utility bundles.
//!
//! The dispatcher builds one [`DestinationClient`] and one [`EventUtilities`]
//! per subscription before invoking the injected handler. The client wraps a
//! shared HTTP connection pool bound to the subscription's host; the utilities
//! wrap derived event data (the extracted issue keys) so handlers don't
//! re-derive it.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::dispatch::{HandlerError, SubscriptionHandler};
use crate::extract::extract_from_fields;
use crate::types::{InstallationId, IssueKey, Subscription, TrackerHost};
use crate::webhooks::{EventKind, SourceEvent};

/// Path on the destination host that accepts change submissions.
const CHANGES_PATH: &str = "/rest/events/1.0/changes";

/// Builds per-subscription destination clients over a shared connection pool.
#[derive(Clone, Default)]
pub struct ClientFactory {
    http: reqwest::Client,
}

impl ClientFactory {
    pub fn new() -> Self {
        ClientFactory {
            http: reqwest::Client::new(),
        }
    }

    /// Builds the client bundle for one subscription: bound to the
    /// subscription's host and installation.
    pub fn client_for(&self, subscription: &Subscription) -> DestinationClient {
        DestinationClient {
            http: self.http.clone(),
            host: subscription.host.clone(),
            installation: subscription.installation,
        }
    }
}

/// An HTTP client bound to one subscription's destination host.
#[derive(Clone)]
pub struct DestinationClient {
    http: reqwest::Client,
    host: TrackerHost,
    installation: InstallationId,
}

impl DestinationClient {
    /// The destination host this client talks to.
    pub fn host(&self) -> &TrackerHost {
        &self.host
    }

    /// The installation this client delivers on behalf of.
    pub fn installation(&self) -> InstallationId {
        self.installation
    }

    /// Submits a change summary to the destination host.
    ///
    /// Maps transport and HTTP-status failures onto the dispatcher's
    /// [`HandlerError`] taxonomy so the caller can distinguish auth problems
    /// from throttling and plain connectivity loss.
    pub async fn submit_change(&self, change: &ChangeSubmission<'_>) -> Result<(), HandlerError> {
        let url = format!("{}{}", self.host.as_str().trim_end_matches('/'), CHANGES_PATH);
        debug!(url = %url, installation = %self.installation, "Submitting change");

        let response = self
            .http
            .post(&url)
            .json(change)
            .send()
            .await
            .map_err(|e| HandlerError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = format!("HTTP {status} from {}", self.host);
        Err(match status.as_u16() {
            401 | 403 => HandlerError::Auth(message),
            429 => HandlerError::RateLimited(message),
            _ => HandlerError::Other(message),
        })
    }
}

/// The change summary a handler submits to a destination.
#[derive(Debug, Serialize)]
pub struct ChangeSubmission<'a> {
    /// The branch the change happened on (empty for tag pushes).
    pub branch: &'a str,

    /// Every distinct issue key the event referenced.
    pub issue_keys: &'a [IssueKey],
}

/// Derived event data handed to every handler invocation.
#[derive(Debug, Clone)]
pub struct EventUtilities {
    issue_keys: Vec<IssueKey>,
}

impl EventUtilities {
    /// Derives the utility bundle for an event: issue keys extracted across
    /// all its text fields, de-duplicated, in first-occurrence order.
    pub fn for_event(event: &SourceEvent) -> Self {
        EventUtilities {
            issue_keys: extract_from_fields(event.text_fields()),
        }
    }

    /// The extracted issue keys, in first-occurrence order.
    pub fn issue_keys(&self) -> &[IssueKey] {
        &self.issue_keys
    }

    /// True when the event referenced no issues at all.
    pub fn is_empty(&self) -> bool {
        self.issue_keys.is_empty()
    }
}

/// The default destination handler: submits the event's change summary
/// (branch plus extracted issue keys) to each subscription's host.
///
/// Events that reference no issues are acknowledged without a network call -
/// the destination has nothing to link them to.
pub fn change_submission_handler() -> SubscriptionHandler {
    Arc::new(|event, client, utilities| {
        Box::pin(async move {
            if utilities.is_empty() {
                debug!(host = %client.host(), "No issue keys; skipping submission");
                return Ok(());
            }

            let branch = match &event.kind {
                EventKind::Push { branch, .. } => branch,
                EventKind::BranchCreated { branch } => branch,
            };
            let change = ChangeSubmission {
                branch,
                issue_keys: utilities.issue_keys(),
            };
            client.submit_change(&change).await
        })
    })
}
