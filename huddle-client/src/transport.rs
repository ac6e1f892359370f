use crate::media::{LocalTrack, TrackKind};
use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{IceCandidate, ParticipantId};
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
    /// Discard a pending local offer (glare resolution).
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn rollback() -> Self {
        Self {
            kind: SdpKind::Rollback,
            sdp: String::new(),
        }
    }
}

/// Identifies one connection to a remote. A link rebuilt after a rejoin or a
/// failure gets a fresh id, so events from the old connection can be told apart.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// Asynchronous notifications from a peer connection to the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// A local ICE candidate to trickle to the remote side.
    CandidateGathered {
        remote: ParticipantId,
        link: LinkId,
        candidate: IceCandidate,
    },
    /// The media path is up.
    Connected { remote: ParticipantId, link: LinkId },
    /// ICE or DTLS gave up on this peer.
    Failed { remote: ParticipantId, link: LinkId },
}

impl LinkEvent {
    pub fn remote(&self) -> &ParticipantId {
        match self {
            Self::CandidateGathered { remote, .. }
            | Self::Connected { remote, .. }
            | Self::Failed { remote, .. } => remote,
        }
    }

    pub fn link(&self) -> LinkId {
        match self {
            Self::CandidateGathered { link, .. }
            | Self::Connected { link, .. }
            | Self::Failed { link, .. } => *link,
        }
    }
}

/// Factory for per-peer connections.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create a connection to `remote` with one audio and one video sender slot.
    /// The connection reports gathered candidates and state through `events`,
    /// tagged with `link`.
    async fn connect(
        &self,
        remote: &ParticipantId,
        link: LinkId,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Box<dyn PeerConnection>>;
}

/// One point-to-point media connection.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<String>;

    async fn create_answer(&self) -> Result<String>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Swap what feeds the sender of `kind` without renegotiating.
    async fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
