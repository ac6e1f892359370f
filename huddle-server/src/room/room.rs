use crate::room::room_command::RoomCommand;
use crate::room::room_manager::RoomManager;
use crate::signaling::SignalingOutput;
use huddle_core::{ConnectionId, ControlMessage, MeetingId, ParticipantId, ParticipantInfo};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct Member {
    info: ParticipantInfo,
    connection: ConnectionId,
    output: Arc<dyn SignalingOutput>,
}

/// Single-writer actor owning the membership of one meeting.
///
/// All registry mutations for a meeting go through this task, so concurrent
/// joins and leaves on the same room are serialized while unrelated rooms
/// never contend.
pub struct Room {
    meeting_id: MeetingId,
    generation: u64,
    created_at: Instant,
    members: BTreeMap<ParticipantId, Member>,
    command_rx: mpsc::Receiver<RoomCommand>,
    manager: RoomManager,
}

impl Room {
    pub(crate) fn new(
        meeting_id: MeetingId,
        generation: u64,
        command_rx: mpsc::Receiver<RoomCommand>,
        manager: RoomManager,
    ) -> Self {
        Self {
            meeting_id,
            generation,
            created_at: Instant::now(),
            members: BTreeMap::new(),
            command_rx,
            manager,
        }
    }

    pub async fn run(mut self) {
        info!(meeting = %self.meeting_id, "Room event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;

            if self.members.is_empty() {
                self.shut_down().await;
                break;
            }
        }

        info!(
            meeting = %self.meeting_id,
            lifetime_ms = self.created_at.elapsed().as_millis() as u64,
            "Room event loop finished"
        );
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                participant,
                connection,
                output,
                joined,
            } => {
                self.join(participant, connection, output).await;
                let _ = joined.send(());
            }

            RoomCommand::Leave {
                participant_id,
                connection,
            } => {
                if !self.is_current(&participant_id, connection) {
                    debug!(
                        meeting = %self.meeting_id,
                        "Ignoring leave from stale connection of {}", participant_id
                    );
                    return;
                }
                self.members.remove(&participant_id);
                info!(meeting = %self.meeting_id, "{} left", participant_id);
                self.broadcast_except(
                    &participant_id,
                    ControlMessage::ParticipantLeft { id: participant_id.clone() },
                )
                .await;
            }

            RoomCommand::Route {
                from,
                connection,
                message,
            } => {
                if !self.is_current(&from, connection) {
                    debug!("Dropping {} from stale sender {}", message.kind(), from);
                    return;
                }
                let Some(to) = message.recipient() else {
                    warn!("Route command without a recipient: {}", message.kind());
                    return;
                };
                let Some(member) = self.members.get(to) else {
                    debug!(
                        meeting = %self.meeting_id,
                        "Dropping {} from {} for absent peer {}",
                        message.kind(),
                        from,
                        to
                    );
                    return;
                };
                member.output.deliver(message).await;
            }

            RoomCommand::Broadcast {
                from,
                connection,
                message,
            } => {
                if !self.is_current(&from, connection) {
                    debug!("Dropping {} from stale sender {}", message.kind(), from);
                    return;
                }
                if let Some(member) = self.members.get_mut(&from) {
                    track_media_state(&mut member.info, &message);
                }
                self.broadcast_except(&from, message).await;
            }

            RoomCommand::Members { reply } => {
                let _ = reply.send(self.members.keys().cloned().collect());
            }
        }
    }

    async fn join(
        &mut self,
        participant: ParticipantInfo,
        connection: ConnectionId,
        output: Arc<dyn SignalingOutput>,
    ) {
        let id = participant.id.clone();

        if self.members.remove(&id).is_some() {
            info!(
                meeting = %self.meeting_id,
                "{} rejoined on a new connection, replacing the old one", id
            );
            self.broadcast_except(&id, ControlMessage::ParticipantLeft { id: id.clone() })
                .await;
        }

        let participants = self.members.values().map(|m| m.info.clone()).collect();
        output
            .deliver(ControlMessage::ExistingParticipants {
                meeting_id: self.meeting_id.clone(),
                participants,
            })
            .await;

        self.broadcast_except(&id, ControlMessage::ParticipantJoined(participant.clone()))
            .await;

        info!(
            meeting = %self.meeting_id,
            members = self.members.len() + 1,
            "{} joined", id
        );
        self.members.insert(
            id,
            Member {
                info: participant,
                connection,
                output,
            },
        );
    }

    fn is_current(&self, id: &ParticipantId, connection: ConnectionId) -> bool {
        self.members
            .get(id)
            .is_some_and(|m| m.connection == connection)
    }

    async fn broadcast_except(&self, skip: &ParticipantId, message: ControlMessage) {
        for (id, member) in &self.members {
            if id == skip {
                continue;
            }
            if !member.output.deliver(message.clone()).await {
                debug!("Member {} is no longer reachable", id);
            }
        }
    }

    /// Removes the registry entry and drains the queue. Drained joins are
    /// dropped unacknowledged so their connections retry on a fresh room.
    async fn shut_down(&mut self) {
        info!(meeting = %self.meeting_id, "Room is empty, destroying");
        self.manager.retire(&self.meeting_id, self.generation);
        self.command_rx.close();

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                RoomCommand::Join { participant, .. } => {
                    debug!(
                        meeting = %self.meeting_id,
                        "Bouncing join of {} off destroyed room", participant.id
                    );
                }
                RoomCommand::Members { reply } => {
                    let _ = reply.send(Vec::new());
                }
                other => debug!("Discarding {} for destroyed room", other.name()),
            }
        }
    }
}

fn track_media_state(info: &mut ParticipantInfo, message: &ControlMessage) {
    match message {
        ControlMessage::AudioToggle { enabled, .. } => info.audio = *enabled,
        ControlMessage::VideoToggle { enabled, .. } => info.video = *enabled,
        ControlMessage::RaiseHand { raised, .. } => info.hand_raised = *raised,
        ControlMessage::ScreenShareStarted { .. } => info.screen_sharing = true,
        ControlMessage::ScreenShareStopped { .. } => info.screen_sharing = false,
        _ => {}
    }
}
