//! Inbound webhook handling for source-platform events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Typed event representations ([`events`])
//! - Payload parsing ([`parser`])

pub mod events;
pub mod parser;
pub mod signature;

pub use events::{Commit, EventKind, SourceEvent};
pub use parser::{ParseError, ParsedDelivery, parse_delivery};
pub use signature::{sign_payload, verify_payload};
