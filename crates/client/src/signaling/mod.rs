//! Signaling channel boundary.

use crate::events::SignalingEvents;
use async_trait::async_trait;
use std::sync::Arc;

mod websocket;

pub use websocket::{WebSocketChannel, WebSocketConnector};

/// Handle to an open (or still opening) signaling channel.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Queue a text payload for delivery. Fire-and-forget; callers hold
    /// payloads back until the channel has reported `opened`.
    fn send(&self, payload: String);

    /// Close the channel. Idempotent, safe on an already-dead channel.
    async fn close(&self);
}

/// Opens one signaling channel per connection attempt.
pub trait SignalingConnector: Send + Sync {
    /// Begin establishing a channel to `url` and return its handle
    /// immediately. The outcome arrives through `events`: `opened` on
    /// success, `errored` on failure. Retrying is the caller's business.
    fn open(&self, url: &str, events: SignalingEvents) -> Arc<dyn SignalingChannel>;
}
