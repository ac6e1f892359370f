use crate::media::{LocalTrack, TrackId, TrackKind};
use crate::transport::{LinkId, PeerConnection};
use huddle_core::{IceCandidate, ParticipantId};
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
    Closed,
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::HaveLocalOffer => "have-local-offer",
            Self::HaveRemoteOffer => "have-remote-offer",
            Self::Stable => "stable",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Which local tracks currently feed this link's senders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTracks {
    pub audio: Option<TrackId>,
    pub video: Option<TrackId>,
}

/// The negotiated connection between the local participant and one remote.
pub struct PeerLink {
    remote_id: ParticipantId,
    id: LinkId,
    connection: Box<dyn PeerConnection>,
    state: NegotiationState,
    remote_description_set: bool,
    connected: bool,
    pending_candidates: Vec<IceCandidate>,
    tracks: LinkTracks,
    deadline: Instant,
}

impl PeerLink {
    pub(crate) fn new(
        remote_id: ParticipantId,
        id: LinkId,
        connection: Box<dyn PeerConnection>,
        deadline: Instant,
    ) -> Self {
        Self {
            remote_id,
            id,
            connection,
            state: NegotiationState::Idle,
            remote_description_set: false,
            connected: false,
            pending_candidates: Vec::new(),
            tracks: LinkTracks::default(),
            deadline,
        }
    }

    pub fn remote_id(&self) -> &ParticipantId {
        &self.remote_id
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn negotiation_state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn tracks(&self) -> &LinkTracks {
        &self.tracks
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub(crate) fn connection(&self) -> &dyn PeerConnection {
        self.connection.as_ref()
    }

    pub(crate) fn set_state(&mut self, state: NegotiationState) {
        self.state = state;
    }

    pub(crate) fn mark_connected(&mut self) {
        self.connected = true;
    }

    pub(crate) fn has_remote_description(&self) -> bool {
        self.remote_description_set
    }

    /// Record that a remote description is in place and hand back the
    /// candidates that were waiting for it.
    pub(crate) fn remote_description_applied(&mut self) -> Vec<IceCandidate> {
        self.remote_description_set = true;
        std::mem::take(&mut self.pending_candidates)
    }

    pub(crate) fn queue_candidate(&mut self, candidate: IceCandidate) {
        self.pending_candidates.push(candidate);
    }

    pub(crate) async fn set_track(
        &mut self,
        kind: TrackKind,
        track: Option<&LocalTrack>,
    ) -> anyhow::Result<()> {
        let id = track.map(|t| t.id().clone());
        let slot = match kind {
            TrackKind::Audio => &self.tracks.audio,
            TrackKind::Video => &self.tracks.video,
        };
        if *slot == id {
            return Ok(());
        }

        self.connection.replace_track(kind, track.cloned()).await?;
        match kind {
            TrackKind::Audio => self.tracks.audio = id,
            TrackKind::Video => self.tracks.video = id,
        }
        Ok(())
    }

    /// Close the connection and drop every reference it holds.
    pub(crate) async fn close(mut self) {
        self.state = NegotiationState::Closed;
        self.pending_candidates.clear();
        self.tracks = LinkTracks::default();
        if let Err(e) = self.connection.close().await {
            tracing::warn!("Failed to close link to {}: {:?}", self.remote_id, e);
        }
    }
}

impl fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerLink")
            .field("remote_id", &self.remote_id)
            .field("state", &self.state)
            .field("connected", &self.connected)
            .field("pending_candidates", &self.pending_candidates.len())
            .field("tracks", &self.tracks)
            .finish()
    }
}
