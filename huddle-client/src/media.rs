use crate::error::MeetError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackSource {
    Microphone,
    Camera,
    Screen,
}

impl TrackSource {
    pub fn kind(self) -> TrackKind {
        match self {
            Self::Microphone => TrackKind::Audio,
            Self::Camera | Self::Screen => TrackKind::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(pub String);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A captured local track. Clones share the same `enabled` flag, so every
/// link that references the track sees a mute immediately.
#[derive(Debug, Clone)]
pub struct LocalTrack {
    id: TrackId,
    source: TrackSource,
    enabled: Arc<AtomicBool>,
}

impl LocalTrack {
    pub fn new(id: impl Into<String>, source: TrackSource) -> Self {
        Self {
            id: TrackId(id.into()),
            source,
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn kind(&self) -> TrackKind {
        self.source.kind()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// Camera and microphone tracks owned by the Peer Connection Manager.
#[derive(Debug, Clone, Default)]
pub struct LocalMediaHandle {
    pub audio: Option<LocalTrack>,
    pub video: Option<LocalTrack>,
}

impl LocalMediaHandle {
    pub fn tracks(&self) -> impl Iterator<Item = &LocalTrack> {
        self.audio.iter().chain(self.video.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }
}

/// Access to capture devices. Acquiring may wait on a permission prompt.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Open microphone and/or camera. Fails with [`MeetError::MediaUnavailable`]
    /// when the platform denies or lacks a requested device.
    async fn acquire(&self, audio: bool, video: bool) -> Result<LocalMediaHandle, MeetError>;

    async fn acquire_screen(&self) -> Result<LocalTrack, MeetError>;

    /// Stop capturing on a track previously handed out.
    fn release(&self, track: &LocalTrack);
}
