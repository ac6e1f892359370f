use crate::room::{RoomCommand, RoomManager};
use crate::signaling::SignalingOutput;
use huddle_core::{
    ConnectionId, ControlMessage, ErrorCode, MeetingId, ParticipantId, ParticipantInfo,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Relay-side state of one client's signaling channel.
///
/// Enforces "join first, one meeting per connection" and stamps every
/// forwarded message with the id the client joined under.
pub struct Connection {
    id: ConnectionId,
    rooms: RoomManager,
    output: Arc<dyn SignalingOutput>,
    joined: Option<(MeetingId, ParticipantId)>,
}

impl Connection {
    pub fn new(id: ConnectionId, rooms: RoomManager, output: Arc<dyn SignalingOutput>) -> Self {
        Self {
            id,
            rooms,
            output,
            joined: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn participant(&self) -> Option<&ParticipantId> {
        self.joined.as_ref().map(|(_, id)| id)
    }

    pub async fn handle_text(&mut self, text: &str) {
        match ControlMessage::from_json(text) {
            Ok(msg) => self.handle(msg).await,
            Err(e) => {
                warn!("Invalid control message on {}: {}", self.id, e);
                self.reject(ErrorCode::Malformed, e.to_string()).await;
            }
        }
    }

    pub async fn handle(&mut self, msg: ControlMessage) {
        match msg {
            ControlMessage::Join {
                meeting_id,
                user_id,
                is_host,
                name,
                audio,
                video,
            } => {
                let mut participant = ParticipantInfo::new(
                    user_id.clone(),
                    name.unwrap_or_else(|| user_id.to_string()),
                    is_host,
                );
                participant.audio = audio.unwrap_or(true);
                participant.video = video.unwrap_or(true);
                self.join(meeting_id, participant).await;
            }
            other => self.forward(other).await,
        }
    }

    async fn join(&mut self, meeting_id: MeetingId, participant: ParticipantInfo) {
        if let Some((meeting, user)) = &self.joined {
            self.reject(
                ErrorCode::AlreadyJoined,
                format!("already joined {meeting} as {user}"),
            )
            .await;
            return;
        }

        let user_id = participant.id.clone();
        info!("Connection {} joins {} as {}", self.id, meeting_id, user_id);
        self.rooms
            .join(&meeting_id, participant, self.id, self.output.clone())
            .await;
        self.joined = Some((meeting_id, user_id));
    }

    async fn forward(&mut self, mut msg: ControlMessage) {
        let Some((meeting, user)) = self.joined.clone() else {
            self.reject(ErrorCode::NotJoined, format!("{} before join", msg.kind()))
                .await;
            return;
        };

        if msg.meeting_id().is_some_and(|m| *m != meeting) {
            self.reject(
                ErrorCode::WrongMeeting,
                format!("{} addressed to another meeting", msg.kind()),
            )
            .await;
            return;
        }

        if let ControlMessage::Leave { .. } = msg {
            self.leave().await;
            return;
        }

        let cmd = if msg.is_directed() {
            msg.stamp_sender(&user);
            RoomCommand::Route {
                from: user,
                connection: self.id,
                message: msg,
            }
        } else if msg.is_broadcast() {
            msg.stamp_sender(&user);
            RoomCommand::Broadcast {
                from: user,
                connection: self.id,
                message: msg,
            }
        } else {
            self.reject(
                ErrorCode::Malformed,
                format!("{} is not a client message", msg.kind()),
            )
            .await;
            return;
        };

        debug!("{} -> room {}: {}", self.id, meeting, cmd.name());
        self.rooms.dispatch(&meeting, cmd).await;
    }

    /// Transport-level disconnect; identical to an explicit `leave`.
    pub async fn close(&mut self) {
        self.leave().await;
    }

    async fn leave(&mut self) {
        let Some((meeting, user)) = self.joined.take() else {
            return;
        };
        info!("Connection {} leaves {} ({})", self.id, meeting, user);
        self.rooms
            .dispatch(
                &meeting,
                RoomCommand::Leave {
                    participant_id: user,
                    connection: self.id,
                },
            )
            .await;
    }

    async fn reject(&self, code: ErrorCode, message: String) {
        self.output
            .deliver(ControlMessage::Error { code, message })
            .await;
    }
}
