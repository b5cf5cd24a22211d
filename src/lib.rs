//! Tracker Bridge - connects a source-control platform's event stream to
//! destination issue trackers.
//!
//! Inbound webhook events are scanned for embedded issue keys, attributed to
//! their tracker projects (with durable occurrence counters), and fanned out
//! independently to every destination subscription of a host - a failure
//! delivering to one destination never blocks the others.

pub mod config;
pub mod destination;
pub mod dispatch;
pub mod extract;
pub mod occurrence;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod types;
pub mod webhooks;
