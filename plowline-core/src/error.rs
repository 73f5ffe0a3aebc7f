//! Error types for plowline-core

use thiserror::Error;

use crate::subscribers::SubscriberId;

/// Errors raised when constructing the event store
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("Invalid capacity {0}: an event store must retain at least one event")]
    InvalidCapacity(usize),
}

/// Errors from the subscriber registry
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Subscriber already registered: {0}")]
    Duplicate(SubscriberId),
}

/// Failure to push one event to one subscriber
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Subscriber connection closed")]
    Closed,

    #[error("Subscriber is not keeping up, {capacity} frames already queued")]
    Backlogged { capacity: usize },

    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}
