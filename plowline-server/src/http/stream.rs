//! Server-Sent Events endpoint for live event streaming
//!
//! Each connection registers a [`ChannelSink`] with the subscriber registry
//! and streams its frames as `data:` events. The subscription ends when the
//! client goes away (the response stream is dropped) or when the registry
//! closes it (delivery failure or server shutdown).

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use plowline_core::{ChannelSink, SubscriberHandle, SubscriberId, SubscriberRegistry};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use crate::AppState;
use crate::error::ServerError;

/// Frames a client may fall behind by before it is dropped
const SINK_BUFFER: usize = 256;

/// GET handler that upgrades the request into a live event stream
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<SubscriberStream>, ServerError> {
    let (sink, frames) = ChannelSink::new(SINK_BUFFER);

    let handle = state
        .registry
        .register(SubscriberId::generate(), Arc::new(sink))
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    info!(subscriber = %handle.id(), "Stream client connected");

    let frames = ReceiverStream::new(frames).take_until(handle.done_token().cancelled_owned());

    let stream = SubscriberStream {
        frames: Box::pin(frames),
        registry: Arc::clone(&state.registry),
        handle,
    };
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Response body of one live-stream connection
///
/// Unregisters its subscriber when dropped.
pub struct SubscriberStream {
    frames: Pin<Box<dyn Stream<Item = String> + Send>>,
    registry: Arc<SubscriberRegistry>,
    handle: SubscriberHandle,
}

impl Stream for SubscriberStream {
    type Item = Result<SseEvent, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.frames
            .as_mut()
            .poll_next(cx)
            .map(|frame| frame.map(|json| Ok(SseEvent::default().data(json))))
    }
}

impl Drop for SubscriberStream {
    fn drop(&mut self) {
        let id = self.handle.id();
        if self.handle.is_done() {
            debug!(subscriber = %id, "Stream closed by server");
        } else if self.registry.unregister(id) {
            info!(subscriber = %id, "Stream client disconnected");
        }
    }
}
