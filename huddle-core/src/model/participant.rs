use crate::model::peer::ParticipantId;
use serde::{Deserialize, Serialize};

fn enabled() -> bool {
    true
}

/// Snapshot of one participant as announced by `participant-joined`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default = "enabled")]
    pub audio: bool,
    #[serde(default = "enabled")]
    pub video: bool,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub screen_sharing: bool,
    #[serde(default)]
    pub hand_raised: bool,
}

impl ParticipantInfo {
    /// New participant with audio and video on, the state every joiner starts in.
    pub fn new(id: ParticipantId, name: impl Into<String>, is_host: bool) -> Self {
        Self {
            id,
            name: name.into(),
            audio: true,
            video: true,
            is_host,
            screen_sharing: false,
            hand_raised: false,
        }
    }

    pub fn apply(&mut self, patch: &ParticipantPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(audio) = patch.audio {
            self.audio = audio;
        }
        if let Some(video) = patch.video {
            self.video = video;
        }
        if let Some(is_host) = patch.is_host {
            self.is_host = is_host;
        }
    }
}

/// Partial update carried by `participant-updated`; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPatch {
    pub id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_host: Option<bool>,
}
