//! Management API: resync, subscription administration, host teardown, and
//! occurrence counters.
//!
//! Hosts are URLs, so endpoints take them in JSON bodies (mutations) or query
//! strings (reads) rather than path segments.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::{AppState, HostSummary};
use crate::dispatch::DispatchError;
use crate::store::PersistenceError;
use crate::types::{InstallationId, Project, Subscription, TrackerHost};

/// Errors returned by the management API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The store could not be reached.
    #[error("store error: {0}")]
    Store(#[from] PersistenceError),

    /// A dispatch call failed before any delivery could be attempted.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Dispatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Query string naming a destination host.
#[derive(Debug, Deserialize)]
pub struct HostQuery {
    pub host: String,
}

/// Body naming a destination host.
#[derive(Debug, Deserialize)]
pub struct HostRequest {
    pub host: String,
}

/// Body naming one subscription.
#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub installation: u64,
    pub host: String,
}

/// Re-delivery trigger: re-runs the pipeline for a host with its last
/// remembered event.
///
/// Handlers are invoked again for every subscription (they must be
/// re-runnable); occurrence counters are protected by the delivery dedupe and
/// do not double-count.
///
/// Returns 404 if no event has been recorded for the host yet.
pub async fn resync_handler(
    State(app_state): State<AppState>,
    Json(request): Json<HostRequest>,
) -> Result<Json<HostSummary>, ApiError> {
    let host = TrackerHost::from(request.host);

    let Some(event) = app_state.last_event_for(&host).await else {
        return Err(ApiError::NotFound(format!("no event recorded for {host}")));
    };

    let result = app_state.deliver(&event).await?;
    info!(
        host = %host,
        attempted = result.attempted,
        succeeded = result.succeeded,
        failed = result.failures.len(),
        "Resync dispatched"
    );

    Ok(Json(HostSummary::from_result(host, &result)))
}

/// Lists a host's subscriptions.
pub async fn list_subscriptions_handler(
    State(app_state): State<AppState>,
    Query(query): Query<HostQuery>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    let host = TrackerHost::from(query.host);
    Ok(Json(app_state.store().subscriptions_for_host(&host)?))
}

/// Registers a subscription linking an installation to a host.
///
/// Idempotent: re-registering an existing link returns the existing row.
pub async fn create_subscription_handler(
    State(app_state): State<AppState>,
    Json(request): Json<SubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    let host = TrackerHost::from(request.host);
    let subscription = app_state
        .store()
        .create_subscription(InstallationId(request.installation), &host)?;

    info!(
        installation = request.installation,
        host = %host,
        "Subscription registered"
    );
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Disconnects a subscription.
///
/// Returns 404 if no such link exists.
pub async fn remove_subscription_handler(
    State(app_state): State<AppState>,
    Json(request): Json<SubscriptionRequest>,
) -> Result<StatusCode, ApiError> {
    let host = TrackerHost::from(request.host);
    let removed = app_state
        .store()
        .remove_subscription(InstallationId(request.installation), &host)?;

    if !removed {
        return Err(ApiError::NotFound(format!(
            "no subscription linking installation {} to {host}",
            request.installation
        )));
    }

    info!(
        installation = request.installation,
        host = %host,
        "Subscription disconnected"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Lists a host's project occurrence counters.
pub async fn list_projects_handler(
    State(app_state): State<AppState>,
    Query(query): Query<HostQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let host = TrackerHost::from(query.host);
    Ok(Json(app_state.store().projects_for_host(&host)?))
}

/// Outcome of a host teardown.
#[derive(Debug, Serialize)]
pub struct TeardownSummary {
    pub subscriptions_removed: usize,
    pub projects_removed: usize,
}

/// Full host teardown: removes every subscription and every project row for
/// the host. The only path that deletes project counters.
///
/// Best-effort sequential deletion: a failure partway through is reported,
/// but rows already deleted stay deleted.
pub async fn remove_host_handler(
    State(app_state): State<AppState>,
    Json(request): Json<HostRequest>,
) -> Result<Json<TeardownSummary>, ApiError> {
    let host = TrackerHost::from(request.host);
    let store = app_state.store();

    let mut subscriptions_removed = 0;
    for subscription in store.subscriptions_for_host(&host)? {
        if store.remove_subscription(subscription.installation, &host)? {
            subscriptions_removed += 1;
        }
    }

    let projects_removed = store.remove_projects_for_host(&host)?;

    info!(
        host = %host,
        subscriptions_removed,
        projects_removed,
        "Host torn down"
    );
    Ok(Json(TeardownSummary {
        subscriptions_removed,
        projects_removed,
    }))
}
