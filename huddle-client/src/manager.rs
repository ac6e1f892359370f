use crate::error::MeetError;
use crate::media::{LocalMediaHandle, LocalTrack, MediaSource, TrackKind};
use crate::peer_link::{NegotiationState, PeerLink};
use crate::signaling::SignalSender;
use crate::transport::{LinkEvent, LinkId, PeerTransport, SessionDescription};
use huddle_core::{ControlMessage, IceCandidate, MeetingId, ParticipantId};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capabilities the manager is built on.
#[derive(Clone)]
pub struct ManagerDeps {
    pub transport: Arc<dyn PeerTransport>,
    pub media: Arc<dyn MediaSource>,
    pub signaling: Arc<dyn SignalSender>,
}

/// Owns local capture and one [`PeerLink`] per other room member.
///
/// All methods run on the session's event loop; nothing here is shared
/// across threads.
pub struct PeerConnectionManager {
    local_id: ParticipantId,
    meeting_id: MeetingId,
    deps: ManagerDeps,
    link_events: mpsc::UnboundedSender<LinkEvent>,
    links: BTreeMap<ParticipantId, PeerLink>,
    next_link: u64,
    local: LocalMediaHandle,
    screen: Option<LocalTrack>,
    negotiation_timeout: Duration,
}

impl PeerConnectionManager {
    pub fn new(
        local_id: ParticipantId,
        meeting_id: MeetingId,
        deps: ManagerDeps,
        link_events: mpsc::UnboundedSender<LinkEvent>,
        negotiation_timeout: Duration,
    ) -> Self {
        Self {
            local_id,
            meeting_id,
            deps,
            link_events,
            links: BTreeMap::new(),
            next_link: 0,
            local: LocalMediaHandle::default(),
            screen: None,
            negotiation_timeout,
        }
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub fn link(&self, remote: &ParticipantId) -> Option<&PeerLink> {
        self.links.get(remote)
    }

    pub fn links(&self) -> impl Iterator<Item = &PeerLink> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn local_media(&self) -> &LocalMediaHandle {
        &self.local
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.screen.is_some()
    }

    /// Open microphone/camera and attach the tracks to every open link.
    pub async fn start_local_capture(
        &mut self,
        want_audio: bool,
        want_video: bool,
    ) -> Result<LocalMediaHandle, MeetError> {
        let handle = self.deps.media.acquire(want_audio, want_video).await?;
        info!(
            audio = handle.audio.is_some(),
            video = handle.video.is_some(),
            "Local capture started"
        );

        for track in [self.local.audio.take(), self.local.video.take()]
            .into_iter()
            .flatten()
        {
            self.deps.media.release(&track);
        }
        self.local = handle.clone();
        self.sync_tracks().await;
        Ok(handle)
    }

    /// Release camera and microphone; links keep their connection but send nothing.
    pub async fn stop_local_capture(&mut self) {
        let local = std::mem::take(&mut self.local);
        self.sync_tracks().await;
        for track in local.tracks() {
            self.deps.media.release(track);
        }
    }

    /// A remote participant is present: create its link if missing and start
    /// negotiating when the tie-break makes us the offerer.
    pub async fn on_peer_joined(&mut self, remote: &ParticipantId) -> Result<(), MeetError> {
        if *remote == self.local_id {
            return Ok(());
        }
        if self.links.contains_key(remote) {
            debug!("Link to {} already open, ignoring duplicate join", remote);
            return Ok(());
        }

        let id = LinkId(self.next_link);
        self.next_link += 1;
        let connection = self
            .deps
            .transport
            .connect(remote, id, self.link_events.clone())
            .await
            .map_err(|e| MeetError::NegotiationFailed {
                peer: remote.clone(),
                reason: format!("{e:#}"),
            })?;

        let deadline = Instant::now() + self.negotiation_timeout;
        let mut link = PeerLink::new(remote.clone(), id, connection, deadline);
        let audio = self.local.audio.clone();
        let video = self.outgoing_video();
        if let Err(e) = attach(&mut link, audio.as_ref(), video.as_ref()).await {
            link.close().await;
            return Err(MeetError::NegotiationFailed {
                peer: remote.clone(),
                reason: format!("{e:#}"),
            });
        }
        self.links.insert(remote.clone(), link);
        info!("Link to {} created", remote);

        if self.local_id.initiates_with(remote) {
            self.send_offer(remote).await?;
        }
        Ok(())
    }

    /// Start a fresh offer/answer round on an existing link, e.g. after an ICE
    /// restart. Either side may call this, so it is the path that can end in glare.
    pub async fn renegotiate(&mut self, remote: &ParticipantId) -> Result<(), MeetError> {
        let Some(link) = self.links.get(remote) else {
            return Err(MeetError::stale(remote, "renegotiate"));
        };
        match link.negotiation_state() {
            NegotiationState::Idle | NegotiationState::Stable => self.send_offer(remote).await,
            _ => Err(MeetError::stale(remote, "renegotiate")),
        }
    }

    async fn send_offer(&mut self, remote: &ParticipantId) -> Result<(), MeetError> {
        let Some(link) = self.links.get_mut(remote) else {
            return Ok(());
        };

        let result = async {
            let sdp = link.connection().create_offer().await?;
            link.connection()
                .set_local_description(SessionDescription::offer(sdp.clone()))
                .await?;
            anyhow::Ok(sdp)
        }
        .await;

        match result {
            Ok(sdp) => {
                link.set_state(NegotiationState::HaveLocalOffer);
                debug!("Sending offer to {}", remote);
                self.signal(ControlMessage::Offer {
                    from: Some(self.local_id.clone()),
                    to: remote.clone(),
                    meeting_id: self.meeting_id.clone(),
                    sdp,
                });
                Ok(())
            }
            Err(e) => Err(self.fail_link(remote, format!("offer: {e:#}")).await),
        }
    }

    pub async fn on_offer_received(
        &mut self,
        from: &ParticipantId,
        sdp: String,
    ) -> Result<(), MeetError> {
        let Some(link) = self.links.get_mut(from) else {
            return Err(MeetError::stale(from, "offer"));
        };

        match link.negotiation_state() {
            NegotiationState::Idle | NegotiationState::Stable => {}
            NegotiationState::HaveLocalOffer => {
                if self.local_id.initiates_with(from) {
                    debug!("Glare with {}: keeping our offer, dropping theirs", from);
                    return Err(MeetError::stale(from, "offer"));
                }
                debug!("Glare with {}: rolling back our offer", from);
                if let Err(e) = link
                    .connection()
                    .set_local_description(SessionDescription::rollback())
                    .await
                {
                    return Err(self.fail_link(from, format!("rollback: {e:#}")).await);
                }
                link.set_state(NegotiationState::Idle);
            }
            NegotiationState::HaveRemoteOffer | NegotiationState::Closed => {
                return Err(MeetError::stale(from, "offer"));
            }
        }

        if let Err(e) = link
            .connection()
            .set_remote_description(SessionDescription::offer(sdp))
            .await
        {
            return Err(self.fail_link(from, format!("remote offer: {e:#}")).await);
        }
        link.set_state(NegotiationState::HaveRemoteOffer);
        flush_candidates(link).await;

        let answer = async {
            let sdp = link.connection().create_answer().await?;
            link.connection()
                .set_local_description(SessionDescription::answer(sdp.clone()))
                .await?;
            anyhow::Ok(sdp)
        }
        .await;

        match answer {
            Ok(sdp) => {
                link.set_state(NegotiationState::Stable);
                debug!("Answering {}", from);
                self.signal(ControlMessage::Answer {
                    from: Some(self.local_id.clone()),
                    to: from.clone(),
                    meeting_id: self.meeting_id.clone(),
                    sdp,
                });
                Ok(())
            }
            Err(e) => Err(self.fail_link(from, format!("answer: {e:#}")).await),
        }
    }

    pub async fn on_answer_received(
        &mut self,
        from: &ParticipantId,
        sdp: String,
    ) -> Result<(), MeetError> {
        let Some(link) = self.links.get_mut(from) else {
            return Err(MeetError::stale(from, "answer"));
        };
        if link.negotiation_state() != NegotiationState::HaveLocalOffer {
            return Err(MeetError::stale(from, "answer"));
        }

        if let Err(e) = link
            .connection()
            .set_remote_description(SessionDescription::answer(sdp))
            .await
        {
            return Err(self.fail_link(from, format!("remote answer: {e:#}")).await);
        }
        link.set_state(NegotiationState::Stable);
        flush_candidates(link).await;
        debug!("Link to {} is stable", from);
        Ok(())
    }

    /// Apply a remote candidate, or queue it until a remote description exists.
    pub async fn on_ice_candidate(
        &mut self,
        from: &ParticipantId,
        candidate: IceCandidate,
    ) -> Result<(), MeetError> {
        let Some(link) = self.links.get_mut(from) else {
            return Err(MeetError::stale(from, "ice-candidate"));
        };

        if candidate.candidate.is_empty() {
            debug!("End of candidates from {}", from);
            return Ok(());
        }
        if !is_well_formed(&candidate) {
            warn!("Dropping malformed ICE candidate from {}: {:?}", from, candidate.candidate);
            return Ok(());
        }

        if !link.has_remote_description() {
            link.queue_candidate(candidate);
            return Ok(());
        }
        if let Err(e) = link.connection().add_ice_candidate(candidate).await {
            warn!("Failed to add ICE candidate from {}: {:?}", from, e);
        }
        Ok(())
    }

    /// Close and forget the link to `remote`. Returns whether one existed.
    pub async fn on_peer_left(&mut self, remote: &ParticipantId) -> bool {
        let Some(link) = self.links.remove(remote) else {
            return false;
        };
        link.close().await;
        info!("Link to {} closed", remote);
        true
    }

    /// Events from a connection that has since been replaced or closed are
    /// stale, even when a new link to the same remote exists.
    pub async fn on_link_event(&mut self, event: LinkEvent) -> Result<(), MeetError> {
        let current = self.links.get(event.remote()).map(PeerLink::id);
        if current != Some(event.link()) {
            debug!("Dropping event from retired {} to {}", event.link(), event.remote());
            return Err(MeetError::stale(event.remote(), "link event"));
        }

        match event {
            LinkEvent::CandidateGathered {
                remote, candidate, ..
            } => {
                self.signal(ControlMessage::IceCandidate {
                    from: Some(self.local_id.clone()),
                    to: remote,
                    meeting_id: self.meeting_id.clone(),
                    candidate,
                });
                Ok(())
            }
            LinkEvent::Connected { remote, .. } => {
                if let Some(link) = self.links.get_mut(&remote) {
                    link.mark_connected();
                }
                info!("Media path to {} is up", remote);
                Ok(())
            }
            LinkEvent::Failed { remote, .. } => {
                Err(self.fail_link(&remote, "connection failed".to_owned()).await)
            }
        }
    }

    /// Tear down every link that has not connected by its deadline.
    pub async fn expire_stalled(&mut self, now: Instant) -> Vec<ParticipantId> {
        let expired: Vec<ParticipantId> = self
            .links
            .values()
            .filter(|l| !l.is_connected() && now >= l.deadline())
            .map(|l| l.remote_id().clone())
            .collect();

        for remote in &expired {
            warn!("Negotiation with {} timed out", remote);
            self.on_peer_left(remote).await;
        }
        expired
    }

    /// Feed the screen into every link's video sender in place of the camera.
    pub async fn start_screen_share(&mut self) -> Result<(), MeetError> {
        if self.screen.is_some() {
            return Ok(());
        }
        let screen = self.deps.media.acquire_screen().await?;
        self.screen = Some(screen);
        self.sync_tracks().await;

        info!("Screen share started");
        self.signal(ControlMessage::ScreenShareStarted {
            meeting_id: self.meeting_id.clone(),
            user_id: self.local_id.clone(),
        });
        Ok(())
    }

    /// Put the camera (or nothing) back on every link's video sender.
    pub async fn stop_screen_share(&mut self) {
        let Some(screen) = self.screen.take() else {
            return;
        };
        self.sync_tracks().await;
        self.deps.media.release(&screen);

        info!("Screen share stopped");
        self.signal(ControlMessage::ScreenShareStopped {
            meeting_id: self.meeting_id.clone(),
            user_id: self.local_id.clone(),
        });
    }

    pub fn toggle_audio(&mut self, enabled: bool) {
        if let Some(track) = &self.local.audio {
            track.set_enabled(enabled);
        }
        self.signal(ControlMessage::AudioToggle {
            meeting_id: self.meeting_id.clone(),
            user_id: self.local_id.clone(),
            enabled,
        });
    }

    pub fn toggle_video(&mut self, enabled: bool) {
        if let Some(track) = &self.local.video {
            track.set_enabled(enabled);
        }
        self.signal(ControlMessage::VideoToggle {
            meeting_id: self.meeting_id.clone(),
            user_id: self.local_id.clone(),
            enabled,
        });
    }

    /// Close every link at once, release all capture and send `leave`.
    pub async fn leave(&mut self) {
        let links = std::mem::take(&mut self.links);
        let count = links.len();
        for (_, link) in links {
            link.close().await;
        }

        if let Some(screen) = self.screen.take() {
            self.deps.media.release(&screen);
        }
        let local = std::mem::take(&mut self.local);
        for track in local.tracks() {
            self.deps.media.release(track);
        }

        info!("Left {} ({} links closed)", self.meeting_id, count);
        self.signal(ControlMessage::Leave {
            meeting_id: self.meeting_id.clone(),
            user_id: self.local_id.clone(),
        });
    }

    fn outgoing_video(&self) -> Option<LocalTrack> {
        self.screen.clone().or_else(|| self.local.video.clone())
    }

    /// Point every link's senders at the current local tracks.
    async fn sync_tracks(&mut self) {
        let audio = self.local.audio.clone();
        let video = self.outgoing_video();

        for link in self.links.values_mut() {
            if let Err(e) = attach(link, audio.as_ref(), video.as_ref()).await {
                warn!("Failed to update tracks on link to {}: {:?}", link.remote_id(), e);
            }
        }
    }

    async fn fail_link(&mut self, remote: &ParticipantId, reason: String) -> MeetError {
        warn!("Link to {} failed: {}", remote, reason);
        self.on_peer_left(remote).await;
        MeetError::NegotiationFailed {
            peer: remote.clone(),
            reason,
        }
    }

    fn signal(&self, msg: ControlMessage) {
        let kind = msg.kind();
        if self.deps.signaling.send(msg).is_err() {
            warn!("Signaling channel closed, dropping {}", kind);
        }
    }
}

async fn attach(
    link: &mut PeerLink,
    audio: Option<&LocalTrack>,
    video: Option<&LocalTrack>,
) -> anyhow::Result<()> {
    link.set_track(TrackKind::Audio, audio).await?;
    link.set_track(TrackKind::Video, video).await?;
    Ok(())
}

async fn flush_candidates(link: &mut PeerLink) {
    let queued = link.remote_description_applied();
    if !queued.is_empty() {
        debug!("Applying {} queued candidates for {}", queued.len(), link.remote_id());
    }
    for candidate in queued {
        if let Err(e) = link.connection().add_ice_candidate(candidate).await {
            warn!("Failed to add queued ICE candidate for {}: {:?}", link.remote_id(), e);
        }
    }
}

fn is_well_formed(candidate: &IceCandidate) -> bool {
    let line = candidate
        .candidate
        .strip_prefix("a=")
        .unwrap_or(&candidate.candidate);
    line.starts_with("candidate:") && line.split_whitespace().count() >= 8
}
