//! Event ingestion handler
//!
//! Accepts Snowplow-style JSON payloads (`{"schema": ..., "data": ...}`) and
//! the legacy form post with a single `message` field.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use chrono::{DateTime, Utc};
use plowline_core::EventData;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::AppState;
use crate::error::IngestError;

/// Schema recorded for legacy form posts
pub const FORM_MESSAGE_SCHEMA: &str = "form/message";

/// Response body for accepted payloads
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
}

/// A validated payload, ready to append
///
/// Each record becomes its own event. Array payloads share one
/// `occurred_at`; single objects leave it to the store.
#[derive(Debug, PartialEq)]
pub struct IngestBatch {
    pub schema: String,
    pub records: Vec<EventData>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// POST handler for the ingestion endpoint
pub async fn ingest_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>, IngestError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let batch = if content_type.contains("application/json") {
        parse_json_payload(&body)?
    } else {
        parse_form_payload(&body)?
    };

    let count = batch.records.len();
    for record in batch.records {
        state
            .store
            .append(batch.schema.as_str(), vec![record], batch.occurred_at)
            .await;
    }
    debug!(schema = %batch.schema, count, "Ingested events");

    Ok(Json(IngestResponse {
        status: "success".to_string(),
    }))
}

/// OPTIONS handler for clients that probe the endpoint without CORS headers
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Validate a JSON payload
pub fn parse_json_payload(body: &[u8]) -> Result<IngestBatch, IngestError> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| IngestError::InvalidJson)?;
    let Value::Object(mut payload) = payload else {
        return Err(IngestError::InvalidJson);
    };

    let schema = match payload.get("schema") {
        Some(Value::String(schema)) => schema.clone(),
        _ => return Err(IngestError::MissingSchema),
    };

    match payload.remove("data") {
        None => Err(IngestError::MissingData),
        Some(Value::Array(items)) => {
            let records: Vec<EventData> = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect();

            if records.is_empty() {
                return Err(IngestError::NoRecords);
            }

            Ok(IngestBatch {
                schema,
                records,
                occurred_at: Some(Utc::now()),
            })
        }
        Some(Value::Object(record)) => Ok(IngestBatch {
            schema,
            records: vec![record],
            occurred_at: None,
        }),
        Some(_) => Err(IngestError::InvalidDataShape),
    }
}

/// Validate a legacy url-encoded form post
pub fn parse_form_payload(body: &[u8]) -> Result<IngestBatch, IngestError> {
    let message = url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "message")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    if message.is_empty() {
        return Err(IngestError::EmptyMessage);
    }

    let mut record = EventData::new();
    record.insert("message".to_string(), Value::String(message));

    Ok(IngestBatch {
        schema: FORM_MESSAGE_SCHEMA.to_string(),
        records: vec![record],
        occurred_at: None,
    })
}
