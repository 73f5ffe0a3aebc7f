//! HTTP server module

mod api;
mod ingest;
mod static_files;
mod stream;

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::{AppState, display};

pub use api::{HealthResponse, ViewerConfig};
pub use ingest::{
    FORM_MESSAGE_SCHEMA, IngestBatch, IngestResponse, parse_form_payload, parse_json_payload,
};
pub use stream::SubscriberStream;

/// Path of the live event stream
pub const STREAM_PATH: &str = "/api/events";

/// Path of the backlog listing for a given ingestion path
pub fn list_path(events_path: &str) -> String {
    format!("{}/list", events_path.trim_end_matches('/'))
}

/// Create the HTTP router with all routes configured
///
/// Also installs the display transformer on the broadcaster, so live pushes
/// carry readable field names.
pub fn create_router(state: Arc<AppState>) -> Router {
    state
        .broadcaster
        .set_transformer(display::transform_event);

    let events_path = state.config.events_path();
    let mut ingestion = Router::new()
        .route(
            &events_path,
            post(ingest::ingest_event).options(ingest::preflight),
        )
        .route(&list_path(&events_path), get(api::list_events));
    if let Some(cors) = cors_layer(&state.config.allowed_origins) {
        ingestion = ingestion.layer(cors);
    }

    Router::new()
        .route("/", get(static_files::index))
        .route(STREAM_PATH, get(stream::stream_events))
        .route("/api/health", get(api::health))
        .route("/api/config", get(api::viewer_config))
        .merge(ingestion)
        .fallback(static_files::static_handler)
        .with_state(state)
}

/// CORS policy for the ingestion routes
///
/// `allowed_origins` is a comma-separated list; `*` allows any origin
/// without credentials; empty disables CORS headers.
fn cors_layer(allowed_origins: &str) -> Option<CorsLayer> {
    let allowed_origins = allowed_origins.trim();
    if allowed_origins.is_empty() {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if allowed_origins == "*" {
        return Some(layer.allow_origin(AllowOrigin::any()));
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        layer
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;
    use axum::http::{HeaderName, StatusCode};
    use axum_test::TestServer;
    use plowline_core::Event;
    use serde_json::json;

    const EVENTS: &str = "/com.simplybusiness/events";
    const LIST: &str = "/com.simplybusiness/events/list";

    fn create_test_server(config: ServerConfig) -> (Arc<AppState>, TestServer) {
        let state = Arc::new(AppState::new(config).unwrap());
        let server = TestServer::new(create_router(Arc::clone(&state))).unwrap();
        (state, server)
    }

    fn origin(value: &'static str) -> (HeaderName, HeaderValue) {
        (header::ORIGIN, HeaderValue::from_static(value))
    }

    #[test]
    fn list_path_appends_suffix() {
        assert_eq!(list_path("/a/b"), "/a/b/list");
        assert_eq!(list_path("/a/b/"), "/a/b/list");
    }

    #[tokio::test]
    async fn test_router_has_health_endpoint() {
        let (_state, server) = create_test_server(ServerConfig::default());
        server.get("/api/health").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_ingest_object_then_list() {
        let (_state, server) = create_test_server(ServerConfig::default());

        let response = server
            .post(EVENTS)
            .json(&json!({"schema": "iglu:payload", "data": {"e": "pv", "url": "/"}}))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({"status": "success"}));

        let events: Vec<Event> = server.get(LIST).await.json();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, 1);
        assert_eq!(events[0].schema, "iglu:payload");
        assert_eq!(events[0].data.len(), 1);
    }

    #[tokio::test]
    async fn test_ingest_array_creates_event_per_object_with_shared_timestamp() {
        let (_state, server) = create_test_server(ServerConfig::default());

        server
            .post(EVENTS)
            .json(&json!({"schema": "batch", "data": [{"e": "pv"}, {"e": "se"}, {"e": "ue"}]}))
            .await
            .assert_status_ok();

        let events: Vec<Event> = server.get(LIST).await.json();
        let ids: Vec<_> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(events.iter().all(|e| e.occurred_at == events[0].occurred_at));
        assert!(events.iter().all(|e| e.data.len() == 1));
    }

    #[tokio::test]
    async fn test_ingest_rejects_malformed_payload_before_storing() {
        let (state, server) = create_test_server(ServerConfig::default());

        let missing_schema = server.post(EVENTS).json(&json!({"data": {}})).await;
        missing_schema.assert_status_bad_request();
        assert_eq!(missing_schema.text(), "Missing schema field");

        let bad_shape = server
            .post(EVENTS)
            .json(&json!({"schema": "s", "data": 3}))
            .await;
        bad_shape.assert_status_bad_request();
        assert_eq!(
            bad_shape.text(),
            "Invalid data format - must be an object or array"
        );

        assert!(state.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_ingest_legacy_form_message() {
        let (_state, server) = create_test_server(ServerConfig::default());

        server
            .post(EVENTS)
            .form(&[("message", "hello")])
            .await
            .assert_status_ok();

        let events: Vec<Event> = server.get(LIST).await.json();
        assert_eq!(events[0].schema, FORM_MESSAGE_SCHEMA);
        assert_eq!(events[0].data[0]["message"], "hello");
    }

    #[tokio::test]
    async fn test_plain_options_is_ok() {
        let (_state, server) = create_test_server(ServerConfig::default());
        server
            .method(Method::OPTIONS, EVENTS)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_get_on_ingest_path_not_allowed() {
        let (_state, server) = create_test_server(ServerConfig::default());
        server
            .get(EVENTS)
            .await
            .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_cors_headers_on_ingestion_routes() {
        let (_state, server) = create_test_server(ServerConfig::default());
        let (name, value) = origin("http://localhost:3000");

        let response = server.get(LIST).add_header(name, value).await;

        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn test_cors_preflight_answered() {
        let (_state, server) = create_test_server(ServerConfig::default());
        let (name, value) = origin("http://localhost:3000");

        let response = server
            .method(Method::OPTIONS, EVENTS)
            .add_header(name, value)
            .add_header(
                header::ACCESS_CONTROL_REQUEST_METHOD,
                HeaderValue::from_static("POST"),
            )
            .await;

        response.assert_status_ok();
        let allowed = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .to_string();
        assert!(allowed.contains("POST"));
    }

    #[tokio::test]
    async fn test_no_cors_headers_when_disabled() {
        let config = ServerConfig {
            allowed_origins: String::new(),
            ..ServerConfig::default()
        };
        let (_state, server) = create_test_server(config);
        let (name, value) = origin("http://localhost:3000");

        let response = server.get(LIST).add_header(name, value).await;

        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_custom_events_endpoint() {
        let config = ServerConfig {
            events_endpoint: "collector/tp2".to_string(),
            ..ServerConfig::default()
        };
        let (_state, server) = create_test_server(config);

        server
            .post("/collector/tp2")
            .json(&json!({"schema": "s", "data": {"k": "v"}}))
            .await
            .assert_status_ok();

        let events: Vec<Event> = server.get("/collector/tp2/list").await.json();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_index_and_unknown_paths() {
        let (_state, server) = create_test_server(ServerConfig::default());

        let index = server.get("/").await;
        index.assert_status_ok();
        assert!(index.text().contains("EventSource"));

        server
            .get("/does-not-exist")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cors_layer_variants() {
        assert!(cors_layer("").is_none());
        assert!(cors_layer("  ").is_none());
        assert!(cors_layer("*").is_some());
        assert!(cors_layer("http://a.test, http://b.test").is_some());
    }

    #[test]
    fn test_create_router_installs_display_transformer() {
        use plowline_core::{EventData, EventSink, SinkError, SubscriberId};
        use std::sync::Mutex;

        let state = Arc::new(AppState::new(ServerConfig::default()).unwrap());
        let _router = create_router(Arc::clone(&state));

        let seen: Arc<Mutex<Vec<Event>>> = Arc::default();
        let sink_seen = Arc::clone(&seen);
        let sink: Arc<dyn EventSink> = Arc::new(move |e: &Event| {
            sink_seen.lock().unwrap().push(e.clone());
            Ok::<(), SinkError>(())
        });
        state.registry.register(SubscriberId::new("x"), sink).unwrap();

        let mut record = EventData::new();
        record.insert("e".to_string(), json!("pv"));
        let event = Event {
            id: 1,
            schema: "s".to_string(),
            data: vec![record],
            occurred_at: chrono::Utc::now(),
            received_at: chrono::Utc::now(),
        };
        state.broadcaster.publish(&event);

        assert_eq!(seen.lock().unwrap()[0].data[0]["kind"], "Page View");
    }
}
