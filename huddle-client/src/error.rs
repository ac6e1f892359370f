use huddle_core::ParticipantId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeetError {
    /// Camera or microphone denied or absent. The meeting goes on without it.
    #[error("media unavailable: {0}")]
    MediaUnavailable(String),

    /// The signaling channel could not be opened; joining is impossible.
    #[error("signaling relay unreachable: {0}")]
    SignalingUnreachable(String),

    /// The handshake with one peer did not complete in time.
    #[error("negotiation with {0} timed out")]
    NegotiationTimeout(ParticipantId),

    /// The handshake with one peer failed; that link has been torn down.
    #[error("negotiation with {peer} failed: {reason}")]
    NegotiationFailed { peer: ParticipantId, reason: String },

    /// A message arrived for a link that cannot use it. Never shown to the user.
    #[error("ignored stale {kind} from {peer}")]
    StaleMessageIgnored {
        peer: ParticipantId,
        kind: &'static str,
    },

    #[error("session closed")]
    Closed,
}

impl MeetError {
    pub(crate) fn stale(peer: &ParticipantId, kind: &'static str) -> Self {
        Self::StaleMessageIgnored {
            peer: peer.clone(),
            kind,
        }
    }

    /// Whether the error is scoped to a single peer link.
    pub fn is_link_scoped(&self) -> bool {
        matches!(
            self,
            Self::NegotiationTimeout(_)
                | Self::NegotiationFailed { .. }
                | Self::StaleMessageIgnored { .. }
        )
    }
}
