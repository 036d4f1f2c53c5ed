//! Media session built on the `webrtc` crate.

use super::{
    DescriptionKind, MediaSession, MediaSessionFactory, MediaStream, SessionDescription,
    TrackKind, TransportState,
};
use crate::error::Result;
use crate::events::MediaEvents;
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// Factory producing one [`WebRtcMediaSession`] per connection attempt.
pub struct WebRtcMediaFactory {
    stun_servers: Vec<String>,
}

impl WebRtcMediaFactory {
    /// Create a factory. `stun_servers` may be empty for LAN use.
    pub fn new(stun_servers: Vec<String>) -> Self {
        Self { stun_servers }
    }
}

#[async_trait]
impl MediaSessionFactory for WebRtcMediaFactory {
    async fn create(&self, events: MediaEvents) -> Result<Arc<dyn MediaSession>> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let registry = register_default_interceptors(Default::default(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: if self.stun_servers.is_empty() {
                Vec::new()
            } else {
                vec![RTCIceServer {
                    urls: self.stun_servers.clone(),
                    ..Default::default()
                }]
            },
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(config).await?);

        // Receive-only: the server pushes the feed, this end renders it.
        // Must be registered before the offer is created so the SDP
        // advertises the recv transceiver.
        peer_connection
            .add_transceiver_from_kind(RTPCodecType::Video, None)
            .await?;

        let state_events = events.clone();
        peer_connection.on_ice_connection_state_change(Box::new(
            move |state: RTCIceConnectionState| {
                debug!(?state, "ICE connection state changed");
                state_events.transport_state(map_ice_state(state));
                Box::pin(async {})
            },
        ));

        let track_events = events.clone();
        peer_connection.on_track(Box::new(move |track: Arc<TrackRemote>, _, _| {
            let events = track_events.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    _ => {
                        warn!("ignoring track of unspecified kind");
                        return;
                    }
                };
                debug!(ssrc = track.ssrc(), ?kind, "inbound track");
                events.track(kind, Arc::new(RemoteTrackStream { track }));
            })
        }));

        Ok(Arc::new(WebRtcMediaSession { peer_connection }))
    }
}

/// [`MediaSession`] backed by an [`RTCPeerConnection`].
pub struct WebRtcMediaSession {
    peer_connection: Arc<RTCPeerConnection>,
}

#[async_trait]
impl MediaSession for WebRtcMediaSession {
    async fn create_local_description(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription {
            kind: DescriptionKind::Offer,
            sdp: offer.sdp,
        })
    }

    async fn apply_descriptions(
        &self,
        local: SessionDescription,
        remote: SessionDescription,
    ) -> Result<()> {
        // The local description is committed here, not at offer time; both
        // sides land back to back once the answer is in.
        self.peer_connection
            .set_local_description(to_rtc(local)?)
            .await?;
        self.peer_connection
            .set_remote_description(to_rtc(remote)?)
            .await?;
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.peer_connection.close().await {
            warn!(error = %e, "failed to close peer connection");
        }
    }
}

/// Opaque [`MediaStream`] wrapper around a remote RTP track.
pub struct RemoteTrackStream {
    /// The underlying track. Sinks downcast to this type to read frames.
    pub track: Arc<TrackRemote>,
}

impl MediaStream for RemoteTrackStream {
    fn id(&self) -> String {
        format!("ssrc-{}", self.track.ssrc())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn to_rtc(description: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match description.kind {
        DescriptionKind::Offer => RTCSessionDescription::offer(description.sdp)?,
        DescriptionKind::Answer => RTCSessionDescription::answer(description.sdp)?,
    };
    Ok(rtc)
}

fn map_ice_state(state: RTCIceConnectionState) -> TransportState {
    match state {
        RTCIceConnectionState::New => TransportState::New,
        RTCIceConnectionState::Checking => TransportState::Negotiating,
        RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => {
            TransportState::Connected
        }
        RTCIceConnectionState::Disconnected => TransportState::Disconnected,
        RTCIceConnectionState::Failed => TransportState::Failed,
        RTCIceConnectionState::Closed => TransportState::Closed,
        // Unspecified is neither new nor healthy; treat it as a failure.
        _ => TransportState::Failed,
    }
}
