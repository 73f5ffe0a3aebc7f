//! Bounded in-memory event store
//!
//! EventStore keeps the most recent events in a VecDeque and hands every
//! append to an attached feed that the broadcaster consumes.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, trace};

use super::types::{Event, EventData, EventId};
use crate::error::StoreError;

struct Buffer {
    events: VecDeque<Event>,
    last_id: EventId,
    feed: Option<mpsc::UnboundedSender<Event>>,
}

/// Capacity-limited, oldest-first event buffer
///
/// Appends serialize on the write lock; `list` takes the read lock and
/// returns a copy. Once `capacity` events are retained, each append evicts
/// the oldest one.
pub struct EventStore {
    buffer: RwLock<Buffer>,
    capacity: usize,
}

impl EventStore {
    /// Create an empty store retaining at most `capacity` events
    pub fn new(capacity: usize) -> Result<Self, StoreError> {
        if capacity == 0 {
            return Err(StoreError::InvalidCapacity(capacity));
        }

        Ok(Self {
            buffer: RwLock::new(Buffer {
                events: VecDeque::with_capacity(capacity),
                last_id: 0,
                feed: None,
            }),
            capacity,
        })
    }

    /// Store a new event and return it with its assigned id
    ///
    /// `occurred_at` defaults to the arrival time. The event is handed to the
    /// feed before the write lock is released, so the feed sees events in id
    /// order. The feed is unbounded: a slow consumer delays pushes but never
    /// loses one, and never holds up an append.
    pub async fn append(
        &self,
        schema: impl Into<String>,
        data: Vec<EventData>,
        occurred_at: Option<DateTime<Utc>>,
    ) -> Event {
        let received_at = Utc::now();
        let mut buffer = self.buffer.write().await;

        buffer.last_id += 1;
        let event = Event {
            id: buffer.last_id,
            schema: schema.into(),
            data,
            occurred_at: occurred_at.unwrap_or(received_at),
            received_at,
        };

        buffer.events.push_back(event.clone());
        if buffer.events.len() > self.capacity
            && let Some(evicted) = buffer.events.pop_front()
        {
            trace!(event_id = evicted.id, "Evicted oldest event");
        }

        let feed_closed = buffer
            .feed
            .as_ref()
            .is_some_and(|feed| feed.send(event.clone()).is_err());
        if feed_closed {
            debug!("Append feed receiver dropped, detaching");
            buffer.feed = None;
        }

        event
    }

    /// Attach the feed of events appended from now on
    ///
    /// There is one feed per store; attaching again replaces it and the
    /// previous receiver ends once drained.
    pub async fn attach_feed(&self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.buffer.write().await.feed = Some(tx);
        rx
    }

    /// Snapshot of the retained events, oldest first
    pub async fn list(&self) -> Vec<Event> {
        self.buffer.read().await.events.iter().cloned().collect()
    }

    /// Maximum number of retained events
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of currently retained events
    pub async fn len(&self) -> usize {
        self.buffer.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Id of the most recently appended event (0 before the first append)
    pub async fn last_id(&self) -> EventId {
        self.buffer.read().await.last_id
    }
}
