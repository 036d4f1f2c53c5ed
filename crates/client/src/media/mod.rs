//! Media session boundary: session descriptions, transport state and the
//! traits a media transport implements.

use crate::error::Result;
use crate::events::MediaEvents;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

mod webrtc;

pub use self::webrtc::{RemoteTrackStream, WebRtcMediaFactory, WebRtcMediaSession};

/// A session description exchanged during negotiation.
///
/// The serialized form is the browser-compatible wire JSON:
/// `{"type": "offer", "sdp": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Offer/answer role of this description.
    #[serde(rename = "type")]
    pub kind: DescriptionKind,
    /// The SDP payload.
    pub sdp: String,
}

/// Role of a [`SessionDescription`] in the offer/answer exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionKind {
    /// Local capability offer.
    Offer,
    /// Remote reply to an offer.
    Answer,
}

/// Lifecycle state of the media transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Initial state, before negotiation has produced any connectivity.
    New,
    /// Connectivity checks in progress.
    Negotiating,
    /// Fully connected, media flowing.
    Connected,
    /// Connectivity lost and the transport will not recover on its own.
    Disconnected,
    /// The transport failed.
    Failed,
    /// The transport was closed.
    Closed,
}

impl TransportState {
    /// Whether the transport is healthy or still converging on its own.
    ///
    /// `New` is deliberately excluded: it precedes negotiation and is
    /// handled separately by the supervisor, which never reconnects on it.
    pub fn is_healthy(&self) -> bool {
        matches!(self, TransportState::Negotiating | TransportState::Connected)
    }
}

/// Kind of an inbound media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Audio track.
    Audio,
    /// Video track.
    Video,
}

/// Opaque handle to an inbound media stream.
///
/// The supervisor routes these to a [`RenderSink`] without interpreting
/// them; sinks that know their transport downcast via [`MediaStream::as_any`].
pub trait MediaStream: Send + Sync {
    /// Stream identifier, for logging.
    fn id(&self) -> String;

    /// Concrete-type access for sinks paired with a specific transport.
    fn as_any(&self) -> &dyn Any;
}

/// Externally supplied rendering surface.
pub trait RenderSink: Send + Sync {
    /// Called with the first inbound video stream of each attempt.
    fn attach(&self, stream: Arc<dyn MediaStream>);

    /// Called on every teardown. Must tolerate not being attached.
    fn detach(&self);
}

/// One media transport session, created fresh for every connection attempt.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Produce the local session description. Invoked exactly once per
    /// session instance; a failure is not retried on the same instance.
    async fn create_local_description(&self) -> Result<SessionDescription>;

    /// Commit both descriptions to the transport. Invoked at most once per
    /// session instance, only after the remote description has arrived.
    async fn apply_descriptions(
        &self,
        local: SessionDescription,
        remote: SessionDescription,
    ) -> Result<()>;

    /// Close the transport. Idempotent.
    async fn close(&self);
}

/// Creates one [`MediaSession`] per connection attempt.
#[async_trait]
pub trait MediaSessionFactory: Send + Sync {
    /// Build a session that reports through `events`.
    async fn create(&self, events: MediaEvents) -> Result<Arc<dyn MediaSession>>;
}
