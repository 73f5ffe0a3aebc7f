//! Shared application state for the plowline server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use plowline_core::{Broadcaster, EventStore, SubscriberRegistry};
use tokio::task::JoinHandle;

use crate::ServerConfig;
use crate::error::ServerError;

/// Shared application state accessible by all handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Retained events
    pub store: Arc<EventStore>,
    /// Connected live-stream clients
    pub registry: Arc<SubscriberRegistry>,
    /// Pushes new events to the registry's subscribers
    pub broadcaster: Arc<Broadcaster>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state sized by `config.max_events`
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let store = Arc::new(EventStore::new(config.max_events)?);
        let registry = Arc::new(SubscriberRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));

        Ok(Self {
            config,
            store,
            registry,
            broadcaster,
            started_at: Utc::now(),
        })
    }

    /// Start the dispatcher that forwards appended events to subscribers
    ///
    /// The store keeps a single feed, so starting again stops the previous
    /// dispatcher.
    pub async fn start_broadcasting(&self) -> JoinHandle<()> {
        let feed = self.store.attach_feed().await;
        Arc::clone(&self.broadcaster).spawn(feed)
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
