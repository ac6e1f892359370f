use crate::signaling::SignalingOutput;
use huddle_core::{ConnectionId, ControlMessage, ParticipantId, ParticipantInfo};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Commands a room actor receives from the signaling connections.
pub enum RoomCommand {
    /// A participant joins; `output` becomes its delivery channel.
    ///
    /// `joined` fires once the member is in the room. A retiring room drops it
    /// unfired and the sender retries against a fresh room.
    Join {
        participant: ParticipantInfo,
        connection: ConnectionId,
        output: Arc<dyn SignalingOutput>,
        joined: oneshot::Sender<()>,
    },

    /// Explicit `leave` or transport-level disconnect.
    Leave {
        participant_id: ParticipantId,
        connection: ConnectionId,
    },

    /// Offer, answer or ICE candidate for a single member.
    Route {
        from: ParticipantId,
        connection: ConnectionId,
        message: ControlMessage,
    },

    /// Chat, reaction, hand and media-state events for every other member.
    Broadcast {
        from: ParticipantId,
        connection: ConnectionId,
        message: ControlMessage,
    },

    /// Current membership, sorted by id.
    Members {
        reply: oneshot::Sender<Vec<ParticipantId>>,
    },
}

impl RoomCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Route { .. } => "route",
            Self::Broadcast { .. } => "broadcast",
            Self::Members { .. } => "members",
        }
    }
}
