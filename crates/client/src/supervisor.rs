//! Connection lifecycle orchestration.
//!
//! The supervisor owns one signaling channel and one media session at a
//! time. It resolves the race between descriptor readiness and channel
//! opening, defers committing the local description until the remote answer
//! arrives, routes the first inbound video track to the render sink, and
//! answers every failure by tearing the attempt down and re-dialing after
//! an exponential backoff delay. Nothing it does surfaces an error to the
//! caller; the only way out of the loop is an explicit stop.

use crate::backoff::Backoff;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::{
    AttemptEvent, AttemptId, EventReceiver, EventSender, MediaEvents, SignalingEvents,
};
use crate::media::{
    MediaSession, MediaSessionFactory, MediaStream, RenderSink, SessionDescription, TrackKind,
    TransportState,
};
use crate::signaling::{SignalingChannel, SignalingConnector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle state of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No attempt started yet, or stopped.
    Idle,
    /// An attempt is underway; negotiation has not completed.
    Connecting,
    /// Both descriptions are committed; the transport is converging.
    Negotiating,
    /// The media transport is fully connected.
    Established,
    /// Waiting out the backoff delay before the next attempt.
    ReconnectPending,
}

/// Observes and stops a running [`ConnectionSupervisor`].
///
/// Dropping the handle without calling [`stop`](Self::stop) also ends the
/// supervisor.
pub struct SupervisorHandle {
    stop_tx: oneshot::Sender<()>,
    state_rx: watch::Receiver<SupervisorState>,
}

impl SupervisorHandle {
    /// The supervisor's current lifecycle state.
    pub fn state(&self) -> SupervisorState {
        *self.state_rx.borrow()
    }

    /// A watch over state changes, for callers that want to await them.
    /// Keeps reporting the last state after the supervisor has stopped.
    pub fn watch_state(&self) -> watch::Receiver<SupervisorState> {
        self.state_rx.clone()
    }

    /// Tear down the current attempt and end the supervisor's run loop.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
    }
}

/// One end-to-end session try and the negotiation state that belongs to it.
struct Attempt {
    id: AttemptId,
    channel: Arc<dyn SignalingChannel>,
    session: Arc<dyn MediaSession>,
    media_events: MediaEvents,
    channel_open: bool,
    /// Typed local description. Retained after its wire copy is sent
    /// because committing it is deferred to remote-description arrival.
    local: Option<SessionDescription>,
    local_sent: bool,
    has_remote: bool,
    video_attached: bool,
}

/// Orchestrates the connection lifecycle.
///
/// Built with [`ConnectionSupervisor::new`], consumed by
/// [`run`](ConnectionSupervisor::run).
pub struct ConnectionSupervisor {
    core: Core,
    events_rx: EventReceiver,
    stop_rx: oneshot::Receiver<()>,
}

impl ConnectionSupervisor {
    /// Build a supervisor and the handle used to stop it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid. Runtime failures
    /// never surface here; they feed the reconnect loop instead.
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn SignalingConnector>,
        media: Arc<dyn MediaSessionFactory>,
        sink: Arc<dyn RenderSink>,
    ) -> Result<(Self, SupervisorHandle)> {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(SupervisorState::Idle);

        let backoff = Backoff::new(
            Duration::from_millis(config.min_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        );

        let core = Core {
            config,
            connector,
            media,
            sink,
            events_tx,
            backoff,
            state: SupervisorState::Idle,
            state_tx,
            attempt_seq: 0,
            attempt: None,
            reconnect_at: None,
        };

        Ok((
            Self {
                core,
                events_rx,
                stop_rx,
            },
            SupervisorHandle { stop_tx, state_rx },
        ))
    }

    /// Drive the connection until stopped, starting the first attempt
    /// immediately. All failures are absorbed into reconnects.
    pub async fn run(self) {
        let Self {
            mut core,
            mut events_rx,
            mut stop_rx,
        } = self;

        core.start_attempt().await;

        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    core.shutdown().await;
                    break;
                }
                event = events_rx.recv() => match event {
                    Some((attempt, event)) => core.handle_event(attempt, event),
                    None => break,
                },
                _ = deadline_elapsed(core.reconnect_at) => {
                    core.start_attempt().await;
                }
            }
        }

        info!("connection supervisor stopped");
    }
}

/// Pends forever while no reconnect deadline is set.
async fn deadline_elapsed(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

struct Core {
    config: ClientConfig,
    connector: Arc<dyn SignalingConnector>,
    media: Arc<dyn MediaSessionFactory>,
    sink: Arc<dyn RenderSink>,
    events_tx: EventSender,
    backoff: Backoff,
    state: SupervisorState,
    state_tx: watch::Sender<SupervisorState>,
    attempt_seq: AttemptId,
    attempt: Option<Attempt>,
    reconnect_at: Option<Instant>,
}

impl Core {
    fn set_state(&mut self, state: SupervisorState) {
        if self.state != state {
            self.state = state;
            let _ = self.state_tx.send(state);
        }
    }

    /// Begin a fresh attempt: open a signaling channel, create a media
    /// session, and request the local description.
    async fn start_attempt(&mut self) {
        self.reconnect_at = None;
        self.attempt_seq += 1;
        let id = self.attempt_seq;
        self.set_state(SupervisorState::Connecting);
        info!(attempt = id, url = %self.config.signaling_url, "starting connection attempt");

        let signaling_events = SignalingEvents::new(id, self.events_tx.clone());
        let channel = self
            .connector
            .open(&self.config.signaling_url, signaling_events);

        let media_events = MediaEvents::new(id, self.events_tx.clone());
        let session = match self.media.create(media_events.clone()).await {
            Ok(session) => session,
            Err(e) => {
                warn!(attempt = id, error = %e, "failed to create media session");
                tokio::spawn(async move {
                    channel.close().await;
                });
                self.schedule_reconnect();
                return;
            }
        };

        self.attempt = Some(Attempt {
            id,
            channel,
            session: session.clone(),
            media_events: media_events.clone(),
            channel_open: false,
            local: None,
            local_sent: false,
            has_remote: false,
            video_attached: false,
        });

        // The description comes back through the event queue, tagged with
        // this attempt, so a slow transport cannot stall the run loop.
        tokio::spawn(async move {
            match session.create_local_description().await {
                Ok(description) => media_events.local_description(description),
                Err(e) => media_events.failed(format!("create_local_description: {}", e)),
            }
        });
    }

    fn handle_event(&mut self, attempt: AttemptId, event: AttemptEvent) {
        if self.attempt.as_ref().map(|a| a.id) != Some(attempt) {
            debug!(attempt, event = event.name(), "discarding event from superseded attempt");
            return;
        }

        match event {
            AttemptEvent::ChannelOpened => {
                debug!(attempt, "signaling channel opened");
                if let Some(a) = self.attempt.as_mut() {
                    a.channel_open = true;
                }
                self.maybe_send_local();
            }
            AttemptEvent::LocalDescription(description) => {
                debug!(attempt, "local description ready");
                if let Some(a) = self.attempt.as_mut() {
                    a.local = Some(description);
                }
                self.maybe_send_local();
            }
            AttemptEvent::ChannelMessage(payload) => self.on_signaling_payload(payload),
            AttemptEvent::ChannelClosed | AttemptEvent::ChannelErrored => {
                if self.attempt.as_ref().is_some_and(|a| a.has_remote) {
                    // Signaling has served its purpose; from here the media
                    // transport is the authoritative failure signal.
                    debug!(attempt, "signaling channel gone after negotiation, ignoring");
                } else {
                    info!(attempt, "signaling channel lost before negotiation");
                    self.schedule_reconnect();
                }
            }
            AttemptEvent::TransportState(state) => self.on_transport_state(state),
            AttemptEvent::Track { kind, stream } => self.on_track(kind, stream),
            AttemptEvent::SessionError(message) => {
                warn!(attempt, %message, "media session failure");
                self.schedule_reconnect();
            }
        }
    }

    /// The local description is sent exactly once, triggered by whichever
    /// of descriptor-ready and channel-open happens second.
    fn maybe_send_local(&mut self) {
        let Some(a) = self.attempt.as_mut() else {
            return;
        };
        if !a.channel_open || a.local_sent {
            return;
        }
        let Some(local) = a.local.as_ref() else {
            return;
        };
        match serde_json::to_string(local) {
            Ok(wire) => {
                a.channel.send(wire);
                a.local_sent = true;
                debug!(attempt = a.id, "local description sent");
            }
            Err(e) => warn!(error = %e, "failed to encode local description"),
        }
    }

    /// A payload arrived on the signaling channel; the only thing the
    /// server sends is the remote description.
    fn on_signaling_payload(&mut self, payload: String) {
        let remote: SessionDescription = match serde_json::from_str(&payload) {
            Ok(description) => description,
            Err(e) => {
                warn!(error = %e, "ignoring non-descriptor signaling payload");
                return;
            }
        };

        let Some(a) = self.attempt.as_mut() else {
            return;
        };
        if a.has_remote {
            warn!(attempt = a.id, "ignoring duplicate remote description");
            return;
        }
        let Some(local) = a.local.clone() else {
            // The server answers our offer; an answer with no offer out
            // means the exchange is broken.
            warn!("remote description arrived before local, restarting");
            self.schedule_reconnect();
            return;
        };

        a.has_remote = true;
        debug!(attempt = a.id, "remote description received, committing both sides");

        // Deliberately deferred: the local description was only sent over
        // the wire so far, both sides are committed together now that the
        // answer is in.
        let session = a.session.clone();
        let events = a.media_events.clone();
        tokio::spawn(async move {
            if let Err(e) = session.apply_descriptions(local, remote).await {
                events.failed(format!("apply_descriptions: {}", e));
            }
        });

        if self.state != SupervisorState::Established {
            self.set_state(SupervisorState::Negotiating);
        }
    }

    fn on_transport_state(&mut self, state: TransportState) {
        debug!(?state, "media transport state");
        if state == TransportState::Connected {
            if self.state != SupervisorState::Established {
                info!("media transport connected");
            }
            self.set_state(SupervisorState::Established);
            self.backoff.reset();
        } else if !state.is_healthy() && state != TransportState::New {
            // New precedes negotiation and never warrants a reconnect.
            info!(?state, "media transport degraded");
            self.schedule_reconnect();
        }
    }

    /// Route the first inbound video track of the attempt to the sink.
    fn on_track(&mut self, kind: TrackKind, stream: Arc<dyn MediaStream>) {
        if kind != TrackKind::Video {
            debug!(?kind, id = %stream.id(), "ignoring non-video track");
            return;
        }
        let Some(a) = self.attempt.as_mut() else {
            return;
        };
        if a.video_attached {
            debug!(id = %stream.id(), "ignoring additional video track");
            return;
        }
        a.video_attached = true;
        info!(id = %stream.id(), "video track received, attaching sink");
        self.sink.attach(stream);
    }

    /// Tear the attempt down and arm the backoff timer. A no-op while a
    /// reconnect is already pending, so a burst of failure signals from
    /// one dying attempt schedules exactly one new attempt.
    fn schedule_reconnect(&mut self) {
        if self.state == SupervisorState::ReconnectPending {
            debug!("reconnect already scheduled");
            return;
        }

        self.teardown();

        let delay = self.backoff.advance();
        self.reconnect_at = Some(Instant::now() + delay);
        self.set_state(SupervisorState::ReconnectPending);
        info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
    }

    /// Release the current attempt's resources. Safe when nothing is held.
    fn teardown(&mut self) {
        self.sink.detach();
        if let Some(attempt) = self.attempt.take() {
            let channel = attempt.channel;
            let session = attempt.session;
            tokio::spawn(async move {
                channel.close().await;
                session.close().await;
            });
        }
    }

    /// Terminal action for an explicit stop.
    async fn shutdown(&mut self) {
        info!("stopping connection supervisor");
        self.reconnect_at = None;
        self.sink.detach();
        if let Some(attempt) = self.attempt.take() {
            attempt.channel.close().await;
            attempt.session.close().await;
        }
        self.set_state(SupervisorState::Idle);
    }
}
