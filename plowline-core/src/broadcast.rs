//! Fan-out of stored events to live subscribers
//!
//! The broadcaster runs as a single dispatcher task fed by the store's
//! append feed, so ingestion never waits on subscribers and pushes leave in
//! id order.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::events::Event;
use crate::subscribers::SubscriberRegistry;

/// Reshapes an event before it is pushed to subscribers
pub type Transformer = Arc<dyn Fn(Event) -> Event + Send + Sync>;

/// Outcome of publishing one event
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that accepted the event
    pub delivered: usize,
    /// Subscribers removed because delivery failed or they were already closed
    pub removed: usize,
}

/// Delivers events to every registered subscriber, isolating failures
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    transformer: RwLock<Option<Transformer>>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            registry,
            transformer: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Install a transform applied on the broadcast path only
    pub fn set_transformer<F>(&self, transformer: F)
    where
        F: Fn(Event) -> Event + Send + Sync + 'static,
    {
        *self
            .transformer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(transformer));
    }

    /// Push one event to every subscriber registered right now
    ///
    /// Subscribers that registered after the snapshot was taken do not get
    /// this event. A failing sink is unregistered and the loop moves on.
    pub fn publish(&self, event: &Event) -> PublishReport {
        let transformer = self
            .transformer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let wire = match transformer {
            Some(transform) => transform(event.clone()),
            None => event.clone(),
        };

        let mut report = PublishReport::default();
        for subscriber in self.registry.snapshot() {
            if subscriber.is_done() {
                self.registry.unregister(&subscriber.id);
                report.removed += 1;
                continue;
            }

            match subscriber.sink.deliver(&wire) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        subscriber = %subscriber.id,
                        event_id = event.id,
                        error = %e,
                        "Delivery failed, removing subscriber"
                    );
                    self.registry.unregister(&subscriber.id);
                    report.removed += 1;
                }
            }
        }

        trace!(
            event_id = event.id,
            delivered = report.delivered,
            removed = report.removed,
            "Published event"
        );
        report
    }

    /// Start the dispatcher task
    ///
    /// Runs until the feed closes, i.e. until the store is dropped or
    /// attaches a new feed.
    pub fn spawn(self: Arc<Self>, mut feed: mpsc::UnboundedReceiver<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!("Broadcast dispatcher started");
            while let Some(event) = feed.recv().await {
                self.publish(&event);
            }
            debug!("Broadcast dispatcher stopped");
        })
    }
}
