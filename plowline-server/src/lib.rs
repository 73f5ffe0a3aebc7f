//! plowline-server - HTTP ingestion and live event streaming
//!
//! This crate provides the server that owns the EventStore, the
//! SubscriberRegistry and the Broadcaster. Trackers POST events to the
//! configured ingestion endpoint; the viewer page loads the backlog from the
//! list endpoint and follows new events over Server-Sent Events.

pub mod display;
mod error;
pub mod http;
mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

pub use error::{IngestError, ServerError};
pub use http::create_router;
pub use state::AppState;

/// How long open connections get to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The main plowline server
pub struct PlowlineServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl PlowlineServer {
    /// Create a new server with fresh state
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let state = Arc::new(AppState::new(config.clone())?);
        Ok(Self { config, state })
    }

    /// Create a server with custom state (for testing)
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Bind to the configured address and serve until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        self.run_until(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until the process ends
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        self.run_until(listener, std::future::pending()).await
    }

    /// Serve on `listener` until `shutdown` resolves
    ///
    /// On shutdown every live subscriber is closed so that open event
    /// streams end, then connections get [`SHUTDOWN_GRACE`] to drain.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!("plowline server listening on {}", addr);

        let dispatcher = self.state.start_broadcasting().await;

        let registry = Arc::clone(&self.state.registry);
        let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
        let graceful = async move {
            shutdown.await;
            info!("Shutdown signal received, closing live streams");
            registry.close_all();
            let _ = signalled_tx.send(());
        };

        let router = create_router(Arc::clone(&self.state));
        let mut serve = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(graceful)
                .await
        });

        let result = tokio::select! {
            joined = &mut serve => flatten(joined),
            Ok(()) = signalled_rx => {
                match tokio::time::timeout(SHUTDOWN_GRACE, &mut serve).await {
                    Ok(joined) => flatten(joined),
                    Err(_) => {
                        warn!("Connections still open after {:?}, forcing shutdown", SHUTDOWN_GRACE);
                        serve.abort();
                        Ok(())
                    }
                }
            }
        };

        dispatcher.abort();
        info!("plowline server stopped");
        result
    }
}

fn flatten(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ServerError::Internal(e.to_string())),
        Err(e) => Err(ServerError::Internal(e.to_string())),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Default ingestion path (without the leading slash)
pub const DEFAULT_EVENTS_ENDPOINT: &str = "com.simplybusiness/events";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Maximum number of retained events
    pub max_events: usize,
    /// Path events are POSTed to
    pub events_endpoint: String,
    /// Origins allowed by CORS on the ingestion routes (comma-separated, empty disables)
    pub allowed_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8081,
            max_events: 100,
            events_endpoint: DEFAULT_EVENTS_ENDPOINT.to_string(),
            allowed_origins: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Returns the socket address string (e.g., "localhost:8081")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the base URL of the viewer page
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Ingestion path, always starting with `/`
    pub fn events_path(&self) -> String {
        let endpoint = self.events_endpoint.trim();
        let endpoint = if endpoint.is_empty() {
            DEFAULT_EVENTS_ENDPOINT
        } else {
            endpoint
        };
        if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{}", endpoint)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8081);
        assert_eq!(config.max_events, 100);
    }

    #[test]
    fn test_server_config_addr_and_url() {
        let config = ServerConfig::new("127.0.0.1", 8080);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_events_path_adds_leading_slash() {
        let config = ServerConfig::default();
        assert_eq!(config.events_path(), "/com.simplybusiness/events");
    }

    #[test]
    fn test_events_path_keeps_existing_slash() {
        let config = ServerConfig {
            events_endpoint: "/collector/tp2".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(config.events_path(), "/collector/tp2");
    }

    #[test]
    fn test_events_path_empty_falls_back_to_default() {
        let config = ServerConfig {
            events_endpoint: "  ".to_string(),
            ..ServerConfig::default()
        };
        assert_eq!(config.events_path(), "/com.simplybusiness/events");
    }

    #[test]
    fn test_plowline_server_new_rejects_zero_capacity() {
        let config = ServerConfig {
            max_events: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            PlowlineServer::new(config),
            Err(ServerError::Store(_))
        ));
    }

    #[test]
    fn test_plowline_server_with_state() {
        let config = ServerConfig::new("127.0.0.1", 9000);
        let state = Arc::new(AppState::new(config.clone()).unwrap());
        let server = PlowlineServer::with_state(config, state);
        assert_eq!(server.config().port, 9000);
        assert_eq!(server.state().store.capacity(), 100);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown() {
        let server = PlowlineServer::new(ServerConfig::new("127.0.0.1", 0)).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            server.run_until(listener, async {}),
        )
        .await
        .expect("server should stop promptly");

        assert!(result.is_ok());
    }
}
