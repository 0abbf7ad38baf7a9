//! Change-event wire types
//!
//! The registry publishes a `ChangeEvent` on the broker channel whenever
//! client policies change. Message bodies are JSON with camelCase keys and
//! an RFC 3339 timestamp.

use serde::Deserialize;
use time::OffsetDateTime;

/// Operation carried by a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Push notification published when policies change
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// Unique id used for duplicate-delivery suppression
    pub event_id: String,

    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,

    pub event_type: String,

    pub operation: Operation,

    /// Clients whose policies changed
    #[serde(default)]
    pub client_ids: Vec<String>,
}
