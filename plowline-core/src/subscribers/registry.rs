//! Registry of connected live-stream subscribers

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::sink::EventSink;
use crate::error::RegistryError;

/// Caller-chosen identity of a subscriber
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id for a new connection
    ///
    /// UUIDv7 encodes the connection start time followed by random bits, so
    /// ids sort by connect time and never repeat.
    pub fn generate() -> Self {
        Self(format!("client_{}", Uuid::now_v7().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered subscriber as seen by the broadcaster
#[derive(Clone)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub sink: Arc<dyn EventSink>,
    done: CancellationToken,
}

impl Subscriber {
    /// Whether the subscriber has already been unregistered
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("done", &self.is_done())
            .finish()
    }
}

/// Returned by [`SubscriberRegistry::register`]
///
/// The transport watches [`done_token`](Self::done_token) to learn that the server
/// closed the subscription (delivery failure or shutdown).
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: SubscriberId,
    done: CancellationToken,
}

impl SubscriberHandle {
    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Token cancelled once the subscriber has been unregistered
    pub fn done_token(&self) -> CancellationToken {
        self.done.clone()
    }
}

/// Tracks the currently open delivery channels
///
/// Uses a synchronous lock so that transports can unregister from `Drop`.
/// No lock is held while a sink runs.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber
    ///
    /// An id that is already present is rejected and the existing entry is
    /// left untouched.
    pub fn register(
        &self,
        id: SubscriberId,
        sink: Arc<dyn EventSink>,
    ) -> Result<SubscriberHandle, RegistryError> {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if subscribers.contains_key(&id) {
            warn!(subscriber = %id, "Rejected duplicate subscriber registration");
            return Err(RegistryError::Duplicate(id));
        }

        let done = CancellationToken::new();
        subscribers.insert(
            id.clone(),
            Subscriber {
                id: id.clone(),
                sink,
                done: done.clone(),
            },
        );
        debug!(subscriber = %id, total = subscribers.len(), "Subscriber registered");

        Ok(SubscriberHandle { id, done })
    }

    /// Remove a subscriber and fire its done signal
    ///
    /// Returns `false` if the id was not registered. Safe to call any number
    /// of times.
    pub fn unregister(&self, id: &SubscriberId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        match removed {
            Some(subscriber) => {
                subscriber.done.cancel();
                debug!(subscriber = %id, "Subscriber unregistered");
                true
            }
            None => false,
        }
    }

    /// Copy of the current subscribers, for iteration outside the lock
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregister everyone; returns how many subscribers were closed
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (_, subscriber) in &drained {
            subscriber.done.cancel();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "Closed all subscribers");
        }
        drained.len()
    }
}
