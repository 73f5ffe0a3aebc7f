//! Event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier assigned to an event when it is appended (starts at 1)
pub type EventId = u64;

/// One schema-less data record carried by an event
pub type EventData = Map<String, Value>;

/// An ingested analytics event
///
/// `data` is a sequence so that one event can carry several sub-records
/// submitted together. The store never looks inside the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned at append time, strictly increasing, never reused
    pub id: EventId,
    /// Logical type or source of the event
    pub schema: String,
    /// Payload records
    pub data: Vec<EventData>,
    /// When the event happened (shared across a batch)
    #[serde(rename = "timestamp")]
    pub occurred_at: DateTime<Utc>,
    /// When the server stored the event
    #[serde(rename = "receivedAt")]
    pub received_at: DateTime<Utc>,
}
