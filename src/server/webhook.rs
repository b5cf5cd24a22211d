//! Webhook endpoint handler.
//!
//! Accepts source-platform webhook deliveries, validates signatures, and runs
//! the event pipeline once per destination host the originating installation
//! fans out to. Delivery outcomes come back in the response body; a partially
//! failed fan-out is still a 202 (the failures are actionable per
//! subscription, not a request error).

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{AppState, HostSummary};
use crate::dispatch::DispatchError;
use crate::store::PersistenceError;
use crate::types::{DeliveryId, TrackerHost};
use crate::webhooks::{ParseError, SourceEvent, parse_delivery, verify_payload};

/// Header name for the event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for the delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for the payload signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Invalid signature.
    #[error("invalid signature")]
    InvalidSignature,

    /// Malformed payload for a known event type.
    #[error("invalid payload: {0}")]
    Parse(#[from] ParseError),

    /// The store could not be reached while resolving destinations.
    #[error("store error: {0}")]
    Store(#[from] PersistenceError),

    /// A dispatch call failed before any delivery could be attempted.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingHeader(_) | WebhookError::Parse(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::Store(_) | WebhookError::Dispatch(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

/// Acknowledgement body for accepted deliveries.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// `dispatched`, `ignored`, or `no_subscriptions`.
    pub outcome: &'static str,

    /// Per-host dispatch summaries (empty unless `dispatched`).
    pub hosts: Vec<HostSummary>,
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers: `X-GitHub-Event`, `X-GitHub-Delivery`,
///   `X-Hub-Signature-256`
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 202 Accepted: processed (or deliberately ignored); body reports per-host
///   outcomes, including per-subscription failures
/// - 400 Bad Request: missing header or malformed payload
/// - 401 Unauthorized: invalid signature
/// - 500 Internal Server Error: store unreachable
pub async fn webhook_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), WebhookError> {
    let event_type = get_header(&headers, HEADER_EVENT)?;
    let delivery_id = DeliveryId::new(get_header(&headers, HEADER_DELIVERY)?);
    let signature = get_header(&headers, HEADER_SIGNATURE)?;

    // Verify before any parsing: malicious requests should cost nothing.
    if !verify_payload(&body, &signature, app_state.webhook_secret()) {
        warn!(delivery = %delivery_id, "Invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    let Some(parsed) = parse_delivery(&event_type, &body)? else {
        debug!(delivery = %delivery_id, event_type = %event_type, "Ignoring event type");
        return Ok((
            StatusCode::ACCEPTED,
            Json(WebhookAck {
                outcome: "ignored",
                hosts: Vec::new(),
            }),
        ));
    };

    // One pipeline run per destination host the installation fans out to.
    let hosts = distinct_hosts(&app_state, &parsed)?;
    if hosts.is_empty() {
        debug!(
            delivery = %delivery_id,
            installation = %parsed.installation,
            "No subscriptions for installation"
        );
        return Ok((
            StatusCode::ACCEPTED,
            Json(WebhookAck {
                outcome: "no_subscriptions",
                hosts: Vec::new(),
            }),
        ));
    }

    let mut summaries = Vec::with_capacity(hosts.len());
    for host in hosts {
        let event = SourceEvent {
            host: host.clone(),
            installation: parsed.installation,
            delivery: delivery_id.clone(),
            kind: parsed.kind.clone(),
        };

        let result = app_state.deliver(&event).await?;
        info!(
            delivery = %delivery_id,
            host = %host,
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failures.len(),
            "Webhook dispatched"
        );
        summaries.push(HostSummary::from_result(host, &result));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(WebhookAck {
            outcome: "dispatched",
            hosts: summaries,
        }),
    ))
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}

/// The distinct destination hosts of an installation, in subscription order.
fn distinct_hosts(
    app_state: &AppState,
    parsed: &crate::webhooks::ParsedDelivery,
) -> Result<Vec<TrackerHost>, WebhookError> {
    let subscriptions = app_state
        .store()
        .subscriptions_for_installation(parsed.installation)?;

    let mut hosts = Vec::new();
    for subscription in subscriptions {
        if !hosts.contains(&subscription.host) {
            hosts.push(subscription.host);
        }
    }
    Ok(hosts)
}
