//! HTTP server for the tracker bridge.
//!
//! This module implements the HTTP surface that:
//! - Accepts source-platform webhooks, validates signatures, and runs the
//!   event pipeline per destination host
//! - Exposes the resync (re-delivery) trigger
//! - Manages subscriptions and host teardown
//! - Provides occurrence counters and health checks for observability
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts webhook deliveries (returns 202)
//! - `POST /api/v1/resync` - Re-runs dispatch for a host with its last event
//! - `GET /api/v1/subscriptions?host=` - Lists a host's subscriptions
//! - `POST /api/v1/subscriptions` - Registers a subscription
//! - `DELETE /api/v1/subscriptions` - Disconnects a subscription
//! - `GET /api/v1/projects?host=` - Lists a host's project counters
//! - `DELETE /api/v1/hosts` - Full host teardown (subscriptions + projects)
//! - `GET /health` - Returns 200 if the server is running

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

pub mod api;
pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

use crate::dispatch::{DispatchResult, Result as DispatchCallResult, SubscriptionHandler};
use crate::pipeline::EventPipeline;
use crate::store::BridgeStore;
use crate::types::{SyncStatus, TrackerHost};
use crate::webhooks::SourceEvent;

/// Shared application state, passed to all handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Webhook secret for HMAC-SHA256 signature verification.
    webhook_secret: Vec<u8>,

    /// The persistence collaborator.
    store: Arc<dyn BridgeStore>,

    /// The event pipeline (extraction → counting → dispatch).
    pipeline: EventPipeline,

    /// The injected per-subscription destination handler.
    handler: SubscriptionHandler,

    /// Last event seen per host, replayed by the resync endpoint.
    last_events: RwLock<HashMap<TrackerHost, SourceEvent>>,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `webhook_secret` - Secret for verifying webhook signatures
    /// * `store` - The persistence backend
    /// * `pipeline` - The event pipeline (normally built over the same store)
    /// * `handler` - The per-subscription destination handler
    pub fn new(
        webhook_secret: impl Into<Vec<u8>>,
        store: Arc<dyn BridgeStore>,
        pipeline: EventPipeline,
        handler: SubscriptionHandler,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                webhook_secret: webhook_secret.into(),
                store,
                pipeline,
                handler,
                last_events: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Returns the webhook secret.
    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }

    /// Returns the persistence backend.
    pub fn store(&self) -> &Arc<dyn BridgeStore> {
        &self.inner.store
    }

    /// Runs the pipeline for one event and applies the route-layer follow-up:
    /// sync statuses updated from the outcome, and the event remembered for
    /// resync.
    pub async fn deliver(&self, event: &SourceEvent) -> DispatchCallResult<DispatchResult> {
        self.inner
            .last_events
            .write()
            .await
            .insert(event.host.clone(), event.clone());

        let result = self
            .inner
            .pipeline
            .handle(event, Arc::clone(&self.inner.handler))
            .await?;

        self.update_sync_statuses(&event.host, &result);
        Ok(result)
    }

    /// Returns the last event delivered to a host, if any.
    pub async fn last_event_for(&self, host: &TrackerHost) -> Option<SourceEvent> {
        self.inner.last_events.read().await.get(host).cloned()
    }

    /// Marks each of the host's subscriptions `Active` or `Failed` from the
    /// dispatch outcome. Best-effort: status writes that fail are logged, not
    /// surfaced - the dispatch result already reached the caller.
    fn update_sync_statuses(&self, host: &TrackerHost, result: &DispatchResult) {
        if result.attempted == 0 {
            return;
        }

        let failed: HashSet<_> = result
            .failures
            .iter()
            .map(|f| f.subscription.installation)
            .collect();

        let subscriptions = match self.inner.store.subscriptions_for_host(host) {
            Ok(subscriptions) => subscriptions,
            Err(error) => {
                warn!(host = %host, error = %error, "Could not load subscriptions for status update");
                return;
            }
        };

        for subscription in subscriptions {
            let status = if failed.contains(&subscription.installation) {
                SyncStatus::Failed
            } else {
                SyncStatus::Active
            };
            if let Err(error) =
                self.inner
                    .store
                    .set_sync_status(subscription.installation, host, status)
            {
                warn!(
                    installation = %subscription.installation,
                    host = %host,
                    error = %error,
                    "Could not update sync status"
                );
            }
        }
    }
}

/// Per-host dispatch summary returned by the webhook and resync endpoints.
#[derive(Debug, Serialize)]
pub struct HostSummary {
    pub host: TrackerHost,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: Vec<FailureSummary>,
}

/// One failed delivery in a [`HostSummary`].
#[derive(Debug, Serialize)]
pub struct FailureSummary {
    pub installation: u64,
    pub error: String,
}

impl HostSummary {
    pub fn from_result(host: TrackerHost, result: &DispatchResult) -> Self {
        HostSummary {
            host,
            attempted: result.attempted,
            succeeded: result.succeeded,
            failed: result
                .failures
                .iter()
                .map(|f| FailureSummary {
                    installation: f.subscription.installation.0,
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{delete, get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/api/v1/resync", post(api::resync_handler))
        .route(
            "/api/v1/subscriptions",
            get(api::list_subscriptions_handler)
                .post(api::create_subscription_handler)
                .delete(api::remove_subscription_handler),
        )
        .route("/api/v1/projects", get(api::list_projects_handler))
        .route("/api/v1/hosts", delete(api::remove_host_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::destination::ClientFactory;
    use crate::store::MemoryStore;

    /// An app state over a fresh in-memory store and an always-succeeding
    /// handler.
    pub fn test_app_state(secret: &[u8]) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let handler: SubscriptionHandler =
            Arc::new(|_event, _client, _util| Box::pin(async { Ok(()) }));
        let state = state_with_handler(secret, store.clone(), handler);
        (state, store)
    }

    /// An app state over a fresh in-memory store and a custom handler.
    pub fn state_with_handler(
        secret: &[u8],
        store: Arc<MemoryStore>,
        handler: SubscriptionHandler,
    ) -> AppState {
        let pipeline = EventPipeline::over_store(store.clone(), ClientFactory::new());
        AppState::new(secret.to_vec(), store, pipeline, handler)
    }
}
