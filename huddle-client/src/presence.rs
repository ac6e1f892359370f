use huddle_core::{ControlMessage, ParticipantId, ParticipantInfo};
use std::collections::BTreeMap;

/// Per-participant display state for the meeting, fed by relay notifications.
///
/// Holds nothing about media connections; a participant can be present here
/// while its link is still negotiating or has failed.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    participants: BTreeMap<ParticipantId, ParticipantInfo>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: ParticipantInfo) {
        self.participants.insert(info.id.clone(), info);
    }

    /// Fold a control message into the participant map. Returns whether
    /// anything changed.
    pub fn apply(&mut self, msg: &ControlMessage) -> bool {
        match msg {
            ControlMessage::ExistingParticipants { participants, .. } => {
                for info in participants {
                    self.insert(info.clone());
                }
                !participants.is_empty()
            }
            ControlMessage::ParticipantJoined(info) => {
                let previous = self.participants.insert(info.id.clone(), info.clone());
                previous.as_ref() != Some(info)
            }
            ControlMessage::ParticipantLeft { id } => self.participants.remove(id).is_some(),
            ControlMessage::ParticipantUpdated(patch) => {
                let Some(info) = self.participants.get_mut(&patch.id) else {
                    return false;
                };
                let before = info.clone();
                info.apply(patch);
                *info != before
            }
            ControlMessage::AudioToggle {
                user_id, enabled, ..
            } => self.update(user_id, |p| p.audio = *enabled),
            ControlMessage::VideoToggle {
                user_id, enabled, ..
            } => self.update(user_id, |p| p.video = *enabled),
            ControlMessage::RaiseHand {
                user_id, raised, ..
            } => self.update(user_id, |p| p.hand_raised = *raised),
            ControlMessage::ScreenShareStarted { user_id, .. } => {
                self.update(user_id, |p| p.screen_sharing = true)
            }
            ControlMessage::ScreenShareStopped { user_id, .. } => {
                self.update(user_id, |p| p.screen_sharing = false)
            }
            _ => false,
        }
    }

    fn update(&mut self, id: &ParticipantId, f: impl FnOnce(&mut ParticipantInfo)) -> bool {
        let Some(info) = self.participants.get_mut(id) else {
            return false;
        };
        let before = info.clone();
        f(info);
        *info != before
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&ParticipantInfo> {
        self.participants.get(id)
    }

    /// Participants ordered by id.
    pub fn participants(&self) -> Vec<&ParticipantInfo> {
        self.participants.values().collect()
    }

    pub fn hosts(&self) -> Vec<&ParticipantId> {
        self.participants
            .values()
            .filter(|p| p.is_host)
            .map(|p| &p.id)
            .collect()
    }

    pub fn raised_hands(&self) -> Vec<&ParticipantId> {
        self.participants
            .values()
            .filter(|p| p.hand_raised)
            .map(|p| &p.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }
}
