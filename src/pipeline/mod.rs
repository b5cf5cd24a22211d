//! Event pipeline: extraction → occurrence tracking → dispatch.
//!
//! One [`EventPipeline::handle`] call processes one inbound event for one
//! destination host:
//!
//! 1. Issue keys are extracted from the event's text fields.
//! 2. Each distinct project prefix gets one occurrence recorded against the
//!    host. This is best-effort telemetry: a persistence failure here is
//!    logged and counted in the summary, never a reason to skip delivery.
//!    Replayed deliveries (resync) skip the counting step entirely via the
//!    TTL'd [`dedupe`] set.
//! 3. The event is fanned out to every subscription of the host.
//!
//! Partial dispatch failure is reported in the returned [`DispatchResult`],
//! not raised; the only fatal error is failing to load the subscription set.

pub mod dedupe;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dispatch::{DispatchResult, SubscriptionDispatcher, SubscriptionHandler};
use crate::extract::extract_from_fields;
use crate::occurrence::OccurrenceTracker;
use crate::store::BridgeStore;
use crate::types::{IssueKey, ProjectKey};
use crate::webhooks::SourceEvent;

use dedupe::DeliveryDedupe;

pub use crate::dispatch::Result;

/// Orchestrates extraction, occurrence tracking, and dispatch for one event.
#[derive(Clone)]
pub struct EventPipeline {
    tracker: OccurrenceTracker,
    dispatcher: SubscriptionDispatcher,
    dedupe: Arc<DeliveryDedupe>,
}

impl EventPipeline {
    pub fn new(tracker: OccurrenceTracker, dispatcher: SubscriptionDispatcher) -> Self {
        EventPipeline {
            tracker,
            dispatcher,
            dedupe: Arc::new(DeliveryDedupe::new()),
        }
    }

    /// Convenience constructor wiring tracker and dispatcher over one store.
    pub fn over_store(
        store: Arc<dyn BridgeStore>,
        clients: crate::destination::ClientFactory,
    ) -> Self {
        EventPipeline::new(
            OccurrenceTracker::new(Arc::clone(&store)),
            SubscriptionDispatcher::new(store, clients),
        )
    }

    /// Processes one event end to end and returns the dispatch outcome.
    ///
    /// Idempotently re-invocable: calling again with the same delivery
    /// re-dispatches (handlers must tolerate that) but does not re-count
    /// occurrences within the dedupe window.
    pub async fn handle(
        &self,
        event: &SourceEvent,
        handler: SubscriptionHandler,
    ) -> Result<DispatchResult> {
        let keys = extract_from_fields(event.text_fields());
        debug!(
            host = %event.host,
            delivery = %event.delivery,
            keys = keys.len(),
            "Extracted issue keys"
        );

        if self.dedupe.first_sighting(&event.delivery, &event.host) {
            self.record_occurrences(event, &keys);
        } else {
            debug!(
                delivery = %event.delivery,
                host = %event.host,
                "Replayed delivery; occurrence counting skipped"
            );
        }

        self.dispatcher.dispatch(&event.host, event, handler).await
    }

    /// Records one occurrence per distinct project prefix. Failures are
    /// logged and swallowed: counting is telemetry, not a delivery gate.
    fn record_occurrences(&self, event: &SourceEvent, keys: &[IssueKey]) {
        for prefix in distinct_prefixes(keys) {
            if let Err(error) = self.tracker.record(&prefix, &event.host) {
                warn!(
                    project_key = %prefix,
                    host = %event.host,
                    error = %error,
                    "Failed to record project occurrence"
                );
            }
        }
    }
}

/// The distinct project prefixes among `keys`, in first-occurrence order.
fn distinct_prefixes(keys: &[IssueKey]) -> Vec<ProjectKey> {
    let mut seen = HashSet::new();
    let mut prefixes = Vec::new();
    for key in keys {
        let prefix = key.project_key();
        if seen.insert(prefix.as_str().to_string()) {
            prefixes.push(prefix);
        }
    }
    prefixes
}
