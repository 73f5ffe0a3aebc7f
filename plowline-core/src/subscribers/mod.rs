//! Live-stream subscribers
//!
//! A subscriber pairs an [`EventSink`] with a done signal. The
//! [`SubscriberRegistry`] owns every live entry; the broadcaster only works
//! from snapshots of it.

pub mod registry;
pub mod sink;

pub use registry::{Subscriber, SubscriberHandle, SubscriberId, SubscriberRegistry};
pub use sink::{ChannelSink, EventSink};
