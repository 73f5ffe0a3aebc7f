//! plowline-core: bounded event retention and live fan-out
//!
//! This crate provides the pieces the plowline server is built from:
//!
//! - **Event store** - [`EventStore`] keeps the most recent events and assigns ids
//! - **Subscribers** - [`SubscriberRegistry`] tracks live-stream clients and their [`EventSink`]s
//! - **Broadcast** - [`Broadcaster`] pushes each stored event to every subscriber
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use plowline_core::{Broadcaster, ChannelSink, EventStore, SubscriberId, SubscriberRegistry};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = EventStore::new(100)?;
//!     let registry = Arc::new(SubscriberRegistry::new());
//!     let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));
//!     broadcaster.spawn(store.attach_feed().await);
//!
//!     let (sink, mut frames) = ChannelSink::new(64);
//!     let _handle = registry.register(SubscriberId::generate(), Arc::new(sink))?;
//!
//!     store.append("page_view", vec![Default::default()], None).await;
//!     if let Some(frame) = frames.recv().await {
//!         println!("pushed: {frame}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! append ──► EventStore ──feed──► Broadcaster ──snapshot──► SubscriberRegistry
//!               │                      │
//!             list()            sink.deliver() per subscriber
//! ```

pub mod broadcast;
pub mod error;
pub mod events;
pub mod subscribers;

pub use broadcast::{Broadcaster, PublishReport, Transformer};
pub use error::{RegistryError, SinkError, StoreError};
pub use events::{Event, EventData, EventId, EventStore};
pub use subscribers::{
    ChannelSink, EventSink, Subscriber, SubscriberHandle, SubscriberId, SubscriberRegistry,
};
