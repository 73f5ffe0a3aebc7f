//! Event model and bounded retention

pub mod store;
pub mod types;

pub use store::EventStore;
pub use types::{Event, EventData, EventId};
