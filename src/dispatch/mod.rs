//! Per-subscription event fan-out with failure isolation.
//!
//! The dispatcher loads every subscription registered for a destination host
//! and invokes a caller-supplied handler once per subscription. Each handler
//! invocation runs in its own tokio task - its own failure domain - so an
//! error (or panic) delivering to one destination never cancels, fails, or
//! delays delivery to the others.
//!
//! The aggregate [`DispatchResult`] waits for every task to settle before
//! returning, and records each failure against its subscription. Partial
//! failure is a value, not an exception: the only error `dispatch` itself
//! returns is a failure to load the subscription set ("who do I even send
//! to"), which leaves nothing to attempt.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::destination::{ClientFactory, DestinationClient, EventUtilities};
use crate::store::{BridgeStore, PersistenceError};
use crate::types::{Subscription, TrackerHost};
use crate::webhooks::SourceEvent;

/// A destination-specific delivery failure, captured per subscription.
///
/// Handlers surface these; the dispatcher additionally converts panics into
/// [`HandlerError::Panicked`] so a misbehaving handler still cannot take down
/// the batch.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// The destination rejected our credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The destination throttled the request.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The destination was unreachable.
    #[error("network error: {0}")]
    Network(String),

    /// The handler task panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Any other destination-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Errors that abort a dispatch call entirely.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The subscription set for the host could not be loaded.
    #[error("failed to load subscriptions for {host}: {source}")]
    SubscriptionLoad {
        host: TrackerHost,
        #[source]
        source: PersistenceError,
    },
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// A delivery failure attributed to one subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionFailure {
    pub subscription: Subscription,
    pub error: HandlerError,
}

/// Aggregate outcome of one dispatch call.
///
/// `attempted == succeeded + failures.len()` always holds; an empty result
/// (zero subscriptions) is not an error.
#[derive(Debug, Clone, Default)]
pub struct DispatchResult {
    /// How many subscriptions were attempted (all of them, always).
    pub attempted: usize,

    /// How many handler invocations completed without error.
    pub succeeded: usize,

    /// The failures, attributed to their subscriptions, in completion order.
    pub failures: Vec<SubscriptionFailure>,
}

impl DispatchResult {
    /// Returns true if every attempted delivery succeeded (vacuously true for
    /// an empty result).
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The future a subscription handler returns.
pub type HandlerFuture = Pin<Box<dyn Future<Output = std::result::Result<(), HandlerError>> + Send>>;

/// A caller-supplied per-subscription handler.
///
/// Receives the inbound event, a destination client bound to the
/// subscription's host, and the utility bundle (extracted issue keys). The
/// dispatcher treats it as opaque: what it does at the destination is the
/// surrounding application's business.
pub type SubscriptionHandler =
    Arc<dyn Fn(SourceEvent, DestinationClient, EventUtilities) -> HandlerFuture + Send + Sync>;

/// Fans events out to every subscription of a destination host.
#[derive(Clone)]
pub struct SubscriptionDispatcher {
    store: Arc<dyn BridgeStore>,
    clients: ClientFactory,
}

impl SubscriptionDispatcher {
    pub fn new(store: Arc<dyn BridgeStore>, clients: ClientFactory) -> Self {
        SubscriptionDispatcher { store, clients }
    }

    /// Invokes `handler` once per subscription registered for `host`.
    ///
    /// All subscriptions are attempted regardless of individual outcomes; the
    /// returned [`DispatchResult`] reports the aggregate. Handlers run
    /// concurrently, one tokio task each, and the call returns only after all
    /// of them have settled.
    ///
    /// # Errors
    ///
    /// Only a failure to load the subscription set is fatal. Per-subscription
    /// failures are captured in the result, never raised.
    pub async fn dispatch(
        &self,
        host: &TrackerHost,
        event: &SourceEvent,
        handler: SubscriptionHandler,
    ) -> Result<DispatchResult> {
        let subscriptions = self.store.subscriptions_for_host(host).map_err(|source| {
            DispatchError::SubscriptionLoad {
                host: host.clone(),
                source,
            }
        })?;

        if subscriptions.is_empty() {
            debug!(host = %host, "No subscriptions registered; nothing to dispatch");
            return Ok(DispatchResult::default());
        }

        let utilities = EventUtilities::for_event(event);

        let mut tasks = JoinSet::new();
        let mut pending: HashMap<tokio::task::Id, Subscription> = HashMap::new();

        for subscription in subscriptions {
            let client = self.clients.client_for(&subscription);
            let handler = Arc::clone(&handler);
            let event = event.clone();
            let utilities = utilities.clone();

            let handle = tasks.spawn(async move { handler(event, client, utilities).await });
            pending.insert(handle.id(), subscription);
        }

        let mut result = DispatchResult {
            attempted: pending.len(),
            ..DispatchResult::default()
        };

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    let Some(subscription) = pending.remove(&id) else {
                        warn!("Completed dispatch task had no pending subscription");
                        continue;
                    };
                    match outcome {
                        Ok(()) => result.succeeded += 1,
                        Err(error) => {
                            warn!(
                                installation = %subscription.installation,
                                host = %subscription.host,
                                error = %error,
                                "Subscription delivery failed"
                            );
                            result.failures.push(SubscriptionFailure {
                                subscription,
                                error,
                            });
                        }
                    }
                }
                Err(join_error) => {
                    let Some(subscription) = pending.remove(&join_error.id()) else {
                        warn!("Failed dispatch task had no pending subscription");
                        continue;
                    };
                    let error = HandlerError::Panicked(panic_message(join_error));
                    warn!(
                        installation = %subscription.installation,
                        host = %subscription.host,
                        error = %error,
                        "Subscription delivery panicked"
                    );
                    result.failures.push(SubscriptionFailure {
                        subscription,
                        error,
                    });
                }
            }
        }

        info!(
            host = %host,
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failures.len(),
            "Dispatch settled"
        );

        Ok(result)
    }
}

/// Extracts a readable message from a panicked (or cancelled) task.
fn panic_message(join_error: tokio::task::JoinError) -> String {
    if !join_error.is_panic() {
        return "task cancelled".to_string();
    }
    let payload = join_error.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
