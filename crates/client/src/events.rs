//! Event plumbing between transport tasks and the supervisor.
//!
//! Transport implementations run their I/O on their own tasks and report
//! everything through these handles. Each handle is bound to the attempt it
//! was issued for, so results arriving after that attempt has been torn
//! down identify themselves and get discarded on receipt.

use crate::media::{MediaStream, SessionDescription, TrackKind, TransportState};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identifier of one connection attempt, unique within a supervisor.
pub type AttemptId = u64;

pub(crate) type EventSender = mpsc::UnboundedSender<(AttemptId, AttemptEvent)>;
pub(crate) type EventReceiver = mpsc::UnboundedReceiver<(AttemptId, AttemptEvent)>;

/// Events delivered to the supervisor state machine.
pub(crate) enum AttemptEvent {
    /// The signaling channel finished opening and accepts sends.
    ChannelOpened,
    /// A text payload arrived on the signaling channel.
    ChannelMessage(String),
    /// The signaling channel closed.
    ChannelClosed,
    /// The signaling channel failed.
    ChannelErrored,
    /// The media session produced its local description.
    LocalDescription(SessionDescription),
    /// The media transport changed state.
    TransportState(TransportState),
    /// An inbound media track arrived.
    Track {
        kind: TrackKind,
        stream: Arc<dyn MediaStream>,
    },
    /// A media session operation failed.
    SessionError(String),
}

impl AttemptEvent {
    /// Event name for logging.
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::ChannelOpened => "channel_opened",
            Self::ChannelMessage(_) => "channel_message",
            Self::ChannelClosed => "channel_closed",
            Self::ChannelErrored => "channel_errored",
            Self::LocalDescription(_) => "local_description",
            Self::TransportState(_) => "transport_state",
            Self::Track { .. } => "track",
            Self::SessionError(_) => "session_error",
        }
    }
}

/// Handle through which a signaling channel reports its lifecycle.
///
/// Cheap to clone; all clones feed the same supervisor and carry the same
/// attempt binding.
#[derive(Clone)]
pub struct SignalingEvents {
    attempt: AttemptId,
    tx: EventSender,
}

impl SignalingEvents {
    pub(crate) fn new(attempt: AttemptId, tx: EventSender) -> Self {
        Self { attempt, tx }
    }

    /// The channel finished opening.
    pub fn opened(&self) {
        self.emit(AttemptEvent::ChannelOpened);
    }

    /// A text payload arrived from the server.
    pub fn message(&self, payload: String) {
        self.emit(AttemptEvent::ChannelMessage(payload));
    }

    /// The channel closed.
    pub fn closed(&self) {
        self.emit(AttemptEvent::ChannelClosed);
    }

    /// The channel failed.
    pub fn errored(&self) {
        self.emit(AttemptEvent::ChannelErrored);
    }

    fn emit(&self, event: AttemptEvent) {
        // Send fails only once the supervisor is gone.
        let _ = self.tx.send((self.attempt, event));
    }
}

/// Handle through which a media session reports its lifecycle.
#[derive(Clone)]
pub struct MediaEvents {
    attempt: AttemptId,
    tx: EventSender,
}

impl MediaEvents {
    pub(crate) fn new(attempt: AttemptId, tx: EventSender) -> Self {
        Self { attempt, tx }
    }

    /// The session produced its local description.
    pub fn local_description(&self, description: SessionDescription) {
        self.emit(AttemptEvent::LocalDescription(description));
    }

    /// The media transport changed state.
    pub fn transport_state(&self, state: TransportState) {
        self.emit(AttemptEvent::TransportState(state));
    }

    /// An inbound media track arrived.
    pub fn track(&self, kind: TrackKind, stream: Arc<dyn MediaStream>) {
        self.emit(AttemptEvent::Track { kind, stream });
    }

    /// A session operation failed.
    pub fn failed(&self, message: impl Into<String>) {
        self.emit(AttemptEvent::SessionError(message.into()));
    }

    fn emit(&self, event: AttemptEvent) {
        let _ = self.tx.send((self.attempt, event));
    }
}
