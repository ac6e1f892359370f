use crate::media::{LocalTrack, TrackId, TrackKind};
use crate::rtc::rtc_config::RtcConfig;
use crate::transport::{
    LinkEvent, LinkId, PeerConnection, PeerTransport, SdpKind, SessionDescription,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::{IceCandidate, ParticipantId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Outgoing sample tracks, one per captured [`LocalTrack`], shared by every link.
#[derive(Default)]
struct TrackRegistry {
    tracks: DashMap<TrackId, Arc<TrackLocalStaticSample>>,
}

impl TrackRegistry {
    fn sample_track(&self, track: &LocalTrack) -> Arc<TrackLocalStaticSample> {
        self.tracks
            .entry(track.id().clone())
            .or_insert_with(|| {
                let mime_type = match track.kind() {
                    TrackKind::Audio => MIME_TYPE_OPUS,
                    TrackKind::Video => MIME_TYPE_VP8,
                };
                Arc::new(TrackLocalStaticSample::new(
                    RTCRtpCodecCapability {
                        mime_type: mime_type.to_owned(),
                        ..Default::default()
                    },
                    track.id().to_string(),
                    "huddle".to_owned(),
                ))
            })
            .clone()
    }
}

/// [`PeerTransport`] on top of the `webrtc` crate.
///
/// Capture code writes encoded samples into [`RtcTransport::sample_track`] and
/// skips writing while the track is disabled.
pub struct RtcTransport {
    api: API,
    config: RtcConfig,
    tracks: Arc<TrackRegistry>,
}

impl RtcTransport {
    pub fn new(config: RtcConfig) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self {
            api,
            config,
            tracks: Arc::new(TrackRegistry::default()),
        })
    }

    pub fn sample_track(&self, track: &LocalTrack) -> Arc<TrackLocalStaticSample> {
        self.tracks.sample_track(track)
    }

    /// Forget the sample track of a released capture.
    pub fn forget_track(&self, track: &LocalTrack) {
        self.tracks.tracks.remove(track.id());
    }
}

#[async_trait]
impl PeerTransport for RtcTransport {
    async fn connect(
        &self,
        remote: &ParticipantId,
        link: LinkId,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Box<dyn PeerConnection>> {
        let rtc_config = RTCConfiguration {
            ice_servers: self.config.rtc_ice_servers(),
            ..Default::default()
        };
        let peer_connection = Arc::new(self.api.new_peer_connection(rtc_config).await?);

        // One sender per kind up front, so later source changes are replace_track only.
        let audio = peer_connection
            .add_transceiver_from_kind(RTPCodecType::Audio, None)
            .await?
            .sender()
            .await;
        let video = peer_connection
            .add_transceiver_from_kind(RTPCodecType::Video, None)
            .await?
            .sender()
            .await;

        let state_tx = events.clone();
        let uid_state = remote.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let uid = uid_state.clone();

                Box::pin(async move {
                    info!("Peer connection state for {} ({}): {}", uid, link, s);
                    match s {
                        RTCPeerConnectionState::Connected => {
                            let _ = tx.send(LinkEvent::Connected { remote: uid, link });
                        }
                        RTCPeerConnectionState::Failed => {
                            let _ = tx.send(LinkEvent::Failed { remote: uid, link });
                        }
                        _ => {}
                    }
                })
            },
        ));

        let ice_tx = events;
        let uid_ice = remote.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let uid = uid_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                };
                let _ = tx.send(LinkEvent::CandidateGathered {
                    remote: uid,
                    link,
                    candidate,
                });
            })
        }));

        Ok(Box::new(RtcConnection {
            remote: remote.clone(),
            peer_connection,
            audio,
            video,
            tracks: self.tracks.clone(),
        }))
    }
}

pub struct RtcConnection {
    remote: ParticipantId,
    peer_connection: Arc<RTCPeerConnection>,
    audio: Arc<RTCRtpSender>,
    video: Arc<RTCRtpSender>,
    tracks: Arc<TrackRegistry>,
}

impl RtcConnection {
    fn description(desc: SessionDescription) -> Result<RTCSessionDescription> {
        let desc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
            SdpKind::Rollback => {
                let mut rollback = RTCSessionDescription::default();
                rollback.sdp_type = RTCSdpType::Rollback;
                rollback
            }
        };
        Ok(desc)
    }
}

#[async_trait]
impl PeerConnection for RtcConnection {
    async fn create_offer(&self) -> Result<String> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(answer.sdp)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = Self::description(desc)?;
        self.peer_connection.set_local_description(desc).await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = Self::description(desc)?;
        self.peer_connection
            .set_remote_description(desc)
            .await
            .with_context(|| format!("remote description from {}", self.remote))?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) -> Result<()> {
        let sender = match kind {
            TrackKind::Audio => &self.audio,
            TrackKind::Video => &self.video,
        };
        let local = track.map(|t| {
            debug!("Feeding {} into {:?} sender for {}", t.id(), kind, self.remote);
            self.tracks.sample_track(&t) as Arc<dyn TrackLocal + Send + Sync>
        });
        sender.replace_track(local).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
