//! Delivery deduplication for occurrence counting.
//!
//! The resync endpoint re-invokes the pipeline with a previously seen
//! delivery. Dispatch must run again (handlers are re-runnable), but project
//! occurrence counters would otherwise double-count. This module tracks seen
//! `(delivery, host)` pairs with a TTL so replays within the retention window
//! skip the counting step.
//!
//! Entries older than the TTL are pruned on every insertion to prevent
//! unbounded growth.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

use crate::types::{DeliveryId, TrackerHost};

/// Default retention for seen deliveries (24 hours).
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// TTL'd set of `(delivery, host)` pairs already counted.
#[derive(Debug)]
pub struct DeliveryDedupe {
    ttl: Duration,
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for DeliveryDedupe {
    fn default() -> Self {
        DeliveryDedupe::new()
    }
}

impl DeliveryDedupe {
    pub fn new() -> Self {
        DeliveryDedupe::with_ttl_hours(DEFAULT_TTL_HOURS)
    }

    pub fn with_ttl_hours(hours: i64) -> Self {
        DeliveryDedupe {
            ttl: Duration::hours(hours),
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` exactly once per `(delivery, host)` pair within the TTL
    /// window, marking the pair as seen.
    pub fn first_sighting(&self, delivery: &DeliveryId, host: &TrackerHost) -> bool {
        let key = format!("{}\u{1f}{}", delivery.as_str(), host.as_str());
        let now = Utc::now();
        let cutoff = now - self.ttl;

        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        seen.retain(|_, stamp| *stamp > cutoff);
        seen.insert(key, now).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(s: &str) -> DeliveryId {
        DeliveryId::new(s)
    }

    fn host(s: &str) -> TrackerHost {
        TrackerHost::from(s)
    }

    #[test]
    fn second_sighting_is_not_first() {
        let dedupe = DeliveryDedupe::new();
        let (d, h) = (delivery("d-1"), host("https://a.example.net"));

        assert!(dedupe.first_sighting(&d, &h));
        assert!(!dedupe.first_sighting(&d, &h));
    }

    #[test]
    fn scope_is_per_host() {
        let dedupe = DeliveryDedupe::new();
        let d = delivery("d-1");

        assert!(dedupe.first_sighting(&d, &host("https://a.example.net")));
        assert!(dedupe.first_sighting(&d, &host("https://b.example.net")));
    }

    #[test]
    fn expired_entries_are_forgotten() {
        // Zero TTL expires entries immediately, so every sighting is a first.
        let dedupe = DeliveryDedupe::with_ttl_hours(0);
        let (d, h) = (delivery("d-1"), host("https://a.example.net"));

        assert!(dedupe.first_sighting(&d, &h));
        assert!(dedupe.first_sighting(&d, &h));
    }
}
