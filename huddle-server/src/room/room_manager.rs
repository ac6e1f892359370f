use crate::room::{Room, RoomCommand};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use huddle_core::{ConnectionId, MeetingId, ParticipantId, ParticipantInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

#[derive(Clone)]
struct RoomHandle {
    generation: u64,
    tx: mpsc::Sender<RoomCommand>,
}

struct RoomManagerInner {
    rooms: DashMap<MeetingId, RoomHandle>,
    generations: AtomicU64,
    queue: usize,
}

/// Room Registry: meeting id to the command queue of that meeting's actor.
///
/// Rooms are spawned by the first `Join` and retire themselves when the last
/// member leaves.
#[derive(Clone)]
pub struct RoomManager {
    inner: Arc<RoomManagerInner>,
}

impl RoomManager {
    pub fn new(queue: usize) -> Self {
        Self {
            inner: Arc::new(RoomManagerInner {
                rooms: DashMap::new(),
                generations: AtomicU64::new(0),
                queue: queue.max(1),
            }),
        }
    }

    /// Deliver a command to the meeting's room. Only `Join` creates a missing room;
    /// anything else addressed to an absent room is dropped.
    pub async fn dispatch(&self, meeting_id: &MeetingId, cmd: RoomCommand) {
        let mut cmd = cmd;

        loop {
            let handle = if matches!(cmd, RoomCommand::Join { .. }) {
                self.room_handle(meeting_id)
            } else {
                let Some(handle) = self.existing_handle(meeting_id) else {
                    debug!("No room {} for {} command", meeting_id, cmd.name());
                    return;
                };
                handle
            };

            match handle.tx.send(cmd).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    // The room retired between lookup and send.
                    self.retire(meeting_id, handle.generation);
                    cmd = returned;
                }
            }
        }
    }

    /// Membership of a live room, or `None` when the meeting has no room.
    pub async fn members(&self, meeting_id: &MeetingId) -> Option<Vec<ParticipantId>> {
        let handle = self.existing_handle(meeting_id)?;
        let (reply, rx) = oneshot::channel();
        handle.tx.send(RoomCommand::Members { reply }).await.ok()?;
        let members = rx.await.ok()?;
        (!members.is_empty()).then_some(members)
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    pub fn contains(&self, meeting_id: &MeetingId) -> bool {
        self.inner.rooms.contains_key(meeting_id)
    }

    fn existing_handle(&self, meeting_id: &MeetingId) -> Option<RoomHandle> {
        self.inner.rooms.get(meeting_id).map(|h| h.clone())
    }

    fn room_handle(&self, meeting_id: &MeetingId) -> RoomHandle {
        self.inner
            .rooms
            .entry(meeting_id.clone())
            .or_insert_with(|| {
                let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
                info!("Creating new room: {} (generation {})", meeting_id, generation);

                let (tx, rx) = mpsc::channel(self.inner.queue);
                let room = Room::new(meeting_id.clone(), generation, rx, self.clone());
                tokio::spawn(room.run());

                RoomHandle { generation, tx }
            })
            .clone()
    }

    /// Drop the registry entry if it still belongs to `generation`.
    pub(crate) fn retire(&self, meeting_id: &MeetingId, generation: u64) {
        let removed = self
            .inner
            .rooms
            .remove_if(meeting_id, |_, h| h.generation == generation);
        if removed.is_some() {
            info!("Room {} removed from registry", meeting_id);
        }
    }

    /// Put a participant into the meeting's room, creating it if needed.
    ///
    /// Returns once the room has inserted the member. A join that lands in a
    /// room already shutting down is bounced back and sent again, which spawns
    /// a fresh room.
    pub async fn join(
        &self,
        meeting_id: &MeetingId,
        participant: ParticipantInfo,
        connection: ConnectionId,
        output: Arc<dyn SignalingOutput>,
    ) {
        loop {
            let (joined, ack) = oneshot::channel();
            self.dispatch(
                meeting_id,
                RoomCommand::Join {
                    participant: participant.clone(),
                    connection,
                    output: output.clone(),
                    joined,
                },
            )
            .await;

            if ack.await.is_ok() {
                return;
            }
            debug!("Join of {} to {} bounced, retrying", participant.id, meeting_id);
        }
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(100)
    }
}
