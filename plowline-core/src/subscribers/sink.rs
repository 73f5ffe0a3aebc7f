//! Delivery sinks

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::SinkError;
use crate::events::Event;

/// Pushes one event to one subscriber
///
/// Implementations must not block: the broadcaster calls `deliver` for
/// every subscriber in turn, and any error removes the subscriber.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &Event) -> Result<(), SinkError>;
}

impl<F> EventSink for F
where
    F: Fn(&Event) -> Result<(), SinkError> + Send + Sync,
{
    fn deliver(&self, event: &Event) -> Result<(), SinkError> {
        self(event)
    }
}

/// Sink that serializes events to JSON frames on a bounded channel
///
/// The receiving half belongs to the transport. A full channel means the
/// client stopped reading; a closed one means it went away.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver its frames arrive on
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, event: &Event) -> Result<(), SinkError> {
        let frame = serde_json::to_string(event)?;
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Backlogged {
                capacity: self.tx.max_capacity(),
            },
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
