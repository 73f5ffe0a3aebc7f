//! Shared test utilities for plowline-server integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use plowline_server::{AppState, PlowlineServer, ServerConfig};
use serde_json::Value;
use tokio::net::TcpListener;

/// Ingestion path of the default configuration
#[allow(dead_code)]
pub const EVENTS_PATH: &str = "/com.simplybusiness/events";

/// Creates a test server with default config, returns state and address
#[allow(dead_code)]
pub async fn create_test_server() -> (Arc<AppState>, SocketAddr) {
    create_test_server_with_config(ServerConfig::new("127.0.0.1", 0)).await
}

/// Creates a test server with custom config
pub async fn create_test_server_with_config(config: ServerConfig) -> (Arc<AppState>, SocketAddr) {
    let state = Arc::new(AppState::new(config.clone()).unwrap());
    let server = PlowlineServer::with_state(config, Arc::clone(&state));
    let addr = spawn_server(server).await;

    (state, addr)
}

/// Spawns server in background task, returns bound address
async fn spawn_server(server: PlowlineServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    addr
}

/// Reads `data:` frames from a Server-Sent Events response
pub struct SseClient {
    response: reqwest::Response,
    buffer: String,
}

impl SseClient {
    /// Open the live event stream
    pub async fn connect(addr: SocketAddr) -> Self {
        let response = reqwest::get(format!("http://{}/api/events", addr))
            .await
            .expect("stream request failed");
        assert!(response.status().is_success());

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"));

        Self {
            response,
            buffer: String::new(),
        }
    }

    /// Next pushed event, or `None` if the stream ended
    pub async fn next_event(&mut self) -> Option<Value> {
        tokio::time::timeout(Duration::from_secs(2), self.read_event())
            .await
            .expect("timed out waiting for a pushed event")
    }

    async fn read_event(&mut self) -> Option<Value> {
        loop {
            while let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                let data: Vec<&str> = block
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect();
                if !data.is_empty() {
                    return Some(serde_json::from_str(&data.join("\n")).unwrap());
                }
            }

            match self.response.chunk().await.ok()? {
                Some(chunk) => self.buffer.push_str(&String::from_utf8_lossy(&chunk)),
                None => return None,
            }
        }
    }
}

/// POST a JSON payload to the ingestion endpoint
#[allow(dead_code)]
pub async fn post_event(addr: SocketAddr, payload: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{}{}", addr, EVENTS_PATH))
        .json(payload)
        .send()
        .await
        .expect("ingest request failed")
}

/// Wait until `condition` holds, polling briefly
#[allow(dead_code)]
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
