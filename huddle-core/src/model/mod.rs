mod meeting;
mod participant;
mod peer;
mod signaling;

pub use meeting::MeetingId;
pub use participant::{ParticipantInfo, ParticipantPatch};
pub use peer::{ConnectionId, ParticipantId};
pub use signaling::{ControlMessage, ErrorCode, IceCandidate, IceServerConfig};
