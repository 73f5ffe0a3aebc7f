//! Display shaping for live-stream pushes
//!
//! Snowplow tracker payloads use terse parameter names (`e`, `se_ca`,
//! `duid`, ...). Before an event is pushed to viewers each record is
//! rewritten into readable fields based on its `e` (event type) value.
//! Stored events and the list endpoint keep the raw records.

use plowline_core::{Event, EventData};
use serde_json::Value;

/// Placeholder for absent structured-event property/value
const NOT_AVAILABLE: &str = "N/A";

/// Fields copied from the tracker payload into every shaped record
const COMMON_FIELDS: &[(&str, &str)] = &[
    ("aid", "app_id"),
    ("duid", "device_id"),
    ("cx", "context"),
];

/// Reshape every record of `event` for display
pub fn transform_event(mut event: Event) -> Event {
    event.data = event.data.into_iter().map(transform_record).collect();
    event
}

/// Reshape one record according to its `e` event type
///
/// Records without a recognised type are returned unchanged.
pub fn transform_record(record: EventData) -> EventData {
    match record.get("e").and_then(Value::as_str) {
        Some("pv") => page_view(&record),
        Some("se") => structured_event(&record),
        Some("ue") => self_describing_event(&record),
        _ => record,
    }
}

fn page_view(record: &EventData) -> EventData {
    let mut shaped = with_kind("Page View");
    copy_fields(
        record,
        &mut shaped,
        &[
            ("url", "url"),
            ("page", "page"),
            ("refr", "referrer"),
            ("tna", "tracker"),
        ],
    );
    copy_fields(record, &mut shaped, COMMON_FIELDS);
    shaped
}

fn structured_event(record: &EventData) -> EventData {
    let mut shaped = with_kind("Structured Event");
    copy_fields(
        record,
        &mut shaped,
        &[
            ("se_ca", "category"),
            ("se_ac", "action"),
            ("se_la", "label"),
        ],
    );
    shaped.insert("property".to_string(), or_not_available(record.get("se_pr")));
    shaped.insert("value".to_string(), or_not_available(record.get("se_va")));
    copy_fields(record, &mut shaped, &[("url", "url")]);
    copy_fields(record, &mut shaped, COMMON_FIELDS);
    shaped
}

fn self_describing_event(record: &EventData) -> EventData {
    let mut shaped = with_kind("Self-Describing Event");
    copy_fields(record, &mut shaped, &[("url", "url"), ("ue_px", "payload")]);
    copy_fields(record, &mut shaped, COMMON_FIELDS);
    shaped
}

fn with_kind(kind: &str) -> EventData {
    let mut shaped = EventData::new();
    shaped.insert("kind".to_string(), Value::String(kind.to_string()));
    shaped
}

fn copy_fields(from: &EventData, to: &mut EventData, fields: &[(&str, &str)]) {
    for (source, target) in fields {
        if let Some(value) = from.get(*source) {
            to.insert((*target).to_string(), value.clone());
        }
    }
}

fn or_not_available(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Null) | None => Value::String(NOT_AVAILABLE.to_string()),
        Some(value) => value.clone(),
    }
}
