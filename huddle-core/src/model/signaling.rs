use crate::model::meeting::MeetingId;
use crate::model::participant::{ParticipantInfo, ParticipantPatch};
use crate::model::peer::ParticipantId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Trickle ICE candidate in the browser's `RTCIceCandidateInit` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Anything other than `join` arrived on a connection that has not joined.
    NotJoined,
    /// A second `join` arrived on a connection that already joined.
    AlreadyJoined,
    /// The frame was not a valid control message.
    Malformed,
    /// The message names a meeting other than the one the connection joined.
    WrongMeeting,
}

/// Every message exchanged over the signaling channel.
///
/// Encoded as `{"type": "<kebab-case tag>", "payload": {..camelCase fields..}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ControlMessage {
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    Join {
        meeting_id: MeetingId,
        user_id: ParticipantId,
        #[serde(default)]
        is_host: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        video: Option<bool>,
    },
    Leave {
        meeting_id: MeetingId,
        user_id: ParticipantId,
    },
    ExistingParticipants {
        meeting_id: MeetingId,
        participants: Vec<ParticipantInfo>,
    },
    ParticipantJoined(ParticipantInfo),
    ParticipantLeft {
        id: ParticipantId,
    },
    ParticipantUpdated(ParticipantPatch),
    Offer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<ParticipantId>,
        to: ParticipantId,
        meeting_id: MeetingId,
        sdp: String,
    },
    Answer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<ParticipantId>,
        to: ParticipantId,
        meeting_id: MeetingId,
        sdp: String,
    },
    IceCandidate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<ParticipantId>,
        to: ParticipantId,
        meeting_id: MeetingId,
        candidate: IceCandidate,
    },
    ChatMessage {
        meeting_id: MeetingId,
        user_id: ParticipantId,
        message: String,
        timestamp: u64,
    },
    Reaction {
        meeting_id: MeetingId,
        user_id: ParticipantId,
        #[serde(rename = "type")]
        kind: String,
        timestamp: u64,
    },
    RaiseHand {
        meeting_id: MeetingId,
        user_id: ParticipantId,
        raised: bool,
    },
    AudioToggle {
        meeting_id: MeetingId,
        user_id: ParticipantId,
        enabled: bool,
    },
    VideoToggle {
        meeting_id: MeetingId,
        user_id: ParticipantId,
        enabled: bool,
    },
    ScreenShareStarted {
        meeting_id: MeetingId,
        user_id: ParticipantId,
    },
    ScreenShareStopped {
        meeting_id: MeetingId,
        user_id: ParticipantId,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ControlMessage {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IceConfig { .. } => "ice-config",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::ExistingParticipants { .. } => "existing-participants",
            Self::ParticipantJoined(_) => "participant-joined",
            Self::ParticipantLeft { .. } => "participant-left",
            Self::ParticipantUpdated(_) => "participant-updated",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "ice-candidate",
            Self::ChatMessage { .. } => "chat-message",
            Self::Reaction { .. } => "reaction",
            Self::RaiseHand { .. } => "raise-hand",
            Self::AudioToggle { .. } => "audio-toggle",
            Self::VideoToggle { .. } => "video-toggle",
            Self::ScreenShareStarted { .. } => "screen-share-started",
            Self::ScreenShareStopped { .. } => "screen-share-stopped",
            Self::Error { .. } => "error",
        }
    }

    /// Offer, answer and ICE candidates: addressed to a single peer.
    pub fn is_directed(&self) -> bool {
        matches!(
            self,
            Self::Offer { .. } | Self::Answer { .. } | Self::IceCandidate { .. }
        )
    }

    /// Client-originated messages the relay fans out to every other room member.
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self,
            Self::ChatMessage { .. }
                | Self::Reaction { .. }
                | Self::RaiseHand { .. }
                | Self::AudioToggle { .. }
                | Self::VideoToggle { .. }
                | Self::ScreenShareStarted { .. }
                | Self::ScreenShareStopped { .. }
        )
    }

    pub fn meeting_id(&self) -> Option<&MeetingId> {
        match self {
            Self::Join { meeting_id, .. }
            | Self::Leave { meeting_id, .. }
            | Self::ExistingParticipants { meeting_id, .. }
            | Self::Offer { meeting_id, .. }
            | Self::Answer { meeting_id, .. }
            | Self::IceCandidate { meeting_id, .. }
            | Self::ChatMessage { meeting_id, .. }
            | Self::Reaction { meeting_id, .. }
            | Self::RaiseHand { meeting_id, .. }
            | Self::AudioToggle { meeting_id, .. }
            | Self::VideoToggle { meeting_id, .. }
            | Self::ScreenShareStarted { meeting_id, .. }
            | Self::ScreenShareStopped { meeting_id, .. } => Some(meeting_id),
            _ => None,
        }
    }

    /// Recipient of a directed message.
    pub fn recipient(&self) -> Option<&ParticipantId> {
        match self {
            Self::Offer { to, .. } | Self::Answer { to, .. } | Self::IceCandidate { to, .. } => {
                Some(to)
            }
            _ => None,
        }
    }

    /// Originator of a directed or broadcast message.
    pub fn sender(&self) -> Option<&ParticipantId> {
        match self {
            Self::Offer { from, .. }
            | Self::Answer { from, .. }
            | Self::IceCandidate { from, .. } => from.as_ref(),
            Self::ChatMessage { user_id, .. }
            | Self::Reaction { user_id, .. }
            | Self::RaiseHand { user_id, .. }
            | Self::AudioToggle { user_id, .. }
            | Self::VideoToggle { user_id, .. }
            | Self::ScreenShareStarted { user_id, .. }
            | Self::ScreenShareStopped { user_id, .. }
            | Self::Join { user_id, .. }
            | Self::Leave { user_id, .. } => Some(user_id),
            _ => None,
        }
    }

    /// Overwrite the originator with the id the relay registered for the connection.
    pub fn stamp_sender(&mut self, id: &ParticipantId) {
        match self {
            Self::Offer { from, .. }
            | Self::Answer { from, .. }
            | Self::IceCandidate { from, .. } => *from = Some(id.clone()),
            Self::ChatMessage { user_id, .. }
            | Self::Reaction { user_id, .. }
            | Self::RaiseHand { user_id, .. }
            | Self::AudioToggle { user_id, .. }
            | Self::VideoToggle { user_id, .. }
            | Self::ScreenShareStarted { user_id, .. }
            | Self::ScreenShareStopped { user_id, .. } => *user_id = id.clone(),
            _ => {}
        }
    }
}
