use crate::chat::{ChatEntry, ChatLog, ReactionEntry, ReactionLog, now_millis};
use crate::config::ClientConfig;
use crate::error::MeetError;
use crate::manager::{ManagerDeps, PeerConnectionManager};
use crate::media::{MediaSource, TrackKind};
use crate::presence::PresenceTracker;
use crate::signaling::{SignalSender, SignalingClient};
use crate::transport::{LinkEvent, PeerTransport};
use huddle_core::{
    ControlMessage, ErrorCode, IceServerConfig, MeetingId, ParticipantId, ParticipantInfo,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Requests from the UI layer into the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    ToggleAudio(bool),
    ToggleVideo(bool),
    StartScreenShare,
    StopScreenShare,
    SendChat(String),
    SendReaction(String),
    RaiseHand(bool),
    Leave,
}

/// Notifications from the session loop to the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ParticipantsChanged,
    ChatReceived(ChatEntry),
    ReactionReceived(ReactionEntry),
    MediaUnavailable(String),
    PeerFailed {
        peer: ParticipantId,
        reason: String,
    },
    NegotiationTimeout(ParticipantId),
    RelayError {
        code: ErrorCode,
        message: String,
    },
    Left,
}

/// Cloneable UI-side handle to a running [`MeetingSession`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn send(&self, cmd: SessionCommand) -> Result<(), MeetError> {
        self.commands.send(cmd).map_err(|_| MeetError::Closed)
    }

    pub fn toggle_audio(&self, enabled: bool) -> Result<(), MeetError> {
        self.send(SessionCommand::ToggleAudio(enabled))
    }

    pub fn toggle_video(&self, enabled: bool) -> Result<(), MeetError> {
        self.send(SessionCommand::ToggleVideo(enabled))
    }

    pub fn start_screen_share(&self) -> Result<(), MeetError> {
        self.send(SessionCommand::StartScreenShare)
    }

    pub fn stop_screen_share(&self) -> Result<(), MeetError> {
        self.send(SessionCommand::StopScreenShare)
    }

    pub fn send_chat(&self, message: impl Into<String>) -> Result<(), MeetError> {
        self.send(SessionCommand::SendChat(message.into()))
    }

    pub fn send_reaction(&self, kind: impl Into<String>) -> Result<(), MeetError> {
        self.send(SessionCommand::SendReaction(kind.into()))
    }

    pub fn raise_hand(&self, raised: bool) -> Result<(), MeetError> {
        self.send(SessionCommand::RaiseHand(raised))
    }

    pub fn leave(&self) -> Result<(), MeetError> {
        self.send(SessionCommand::Leave)
    }
}

/// One participant's view of a meeting: a single-threaded loop over relay
/// messages, link events, UI commands and a housekeeping tick.
pub struct MeetingSession {
    local: ParticipantInfo,
    meeting_id: MeetingId,
    manager: PeerConnectionManager,
    presence: PresenceTracker,
    chat: ChatLog,
    reactions: ReactionLog,
    signaling: Arc<dyn SignalSender>,
    inbound: mpsc::UnboundedReceiver<ControlMessage>,
    link_events: mpsc::UnboundedReceiver<LinkEvent>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    ice_servers: Vec<IceServerConfig>,
    housekeeping_interval: Duration,
    left: bool,
    _client: Option<SignalingClient>,
}

impl MeetingSession {
    pub fn new(
        local: ParticipantInfo,
        meeting_id: MeetingId,
        config: &ClientConfig,
        deps: ManagerDeps,
        inbound: mpsc::UnboundedReceiver<ControlMessage>,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let signaling = deps.signaling.clone();
        let manager = PeerConnectionManager::new(
            local.id.clone(),
            meeting_id.clone(),
            deps,
            link_tx,
            config.negotiation_timeout,
        );

        let session = Self {
            local,
            meeting_id,
            manager,
            presence: PresenceTracker::new(),
            chat: ChatLog::new(config.chat_capacity),
            reactions: ReactionLog::new(config.reaction_capacity, config.reaction_ttl),
            signaling,
            inbound,
            link_events: link_rx,
            commands: cmd_rx,
            events: event_tx,
            ice_servers: Vec::new(),
            housekeeping_interval: config.housekeeping_interval,
            left: false,
            _client: None,
        };
        (session, SessionHandle { commands: cmd_tx }, event_rx)
    }

    /// Open the relay websocket and build a session on top of it.
    pub async fn connect(
        config: &ClientConfig,
        meeting_id: MeetingId,
        user_id: ParticipantId,
        is_host: bool,
        transport: Arc<dyn PeerTransport>,
        media: Arc<dyn MediaSource>,
    ) -> Result<(Self, SessionHandle, mpsc::UnboundedReceiver<SessionEvent>), MeetError> {
        let (client, inbound) = SignalingClient::connect(&config.relay_url).await?;
        let deps = ManagerDeps {
            transport,
            media,
            signaling: Arc::new(client.sender()),
        };

        let name = config
            .display_name
            .clone()
            .unwrap_or_else(|| user_id.to_string());
        let local = ParticipantInfo::new(user_id, name, is_host);
        let (mut session, handle, events) = Self::new(local, meeting_id, config, deps, inbound);
        session._client = Some(client);
        Ok((session, handle, events))
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local.id
    }

    pub fn meeting_id(&self) -> &MeetingId {
        &self.meeting_id
    }

    pub fn manager(&self) -> &PeerConnectionManager {
        &self.manager
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    pub fn reactions(&self) -> &ReactionLog {
        &self.reactions
    }

    /// STUN/TURN list announced by the relay, empty until `ice-config` arrives.
    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    pub fn has_left(&self) -> bool {
        self.left
    }

    /// Capture local media and announce ourselves to the room.
    ///
    /// A denied or missing device is reported as [`SessionEvent::MediaUnavailable`]
    /// and the join continues without it.
    pub async fn join(&mut self, audio: bool, video: bool) -> Result<(), MeetError> {
        let (has_audio, has_video) = if audio || video {
            match self.manager.start_local_capture(audio, video).await {
                Ok(handle) => (handle.audio.is_some(), handle.video.is_some()),
                Err(e) => {
                    warn!("Joining without local media: {}", e);
                    self.report(e);
                    (false, false)
                }
            }
        } else {
            (false, false)
        };
        self.local.audio = has_audio;
        self.local.video = has_video;

        self.signaling.send(ControlMessage::Join {
            meeting_id: self.meeting_id.clone(),
            user_id: self.local.id.clone(),
            is_host: self.local.is_host,
            name: Some(self.local.name.clone()),
            audio: Some(has_audio),
            video: Some(has_video),
        })?;
        info!("Joining {} as {}", self.meeting_id, self.local.id);

        self.presence.insert(self.local.clone());
        self.emit(SessionEvent::ParticipantsChanged);
        Ok(())
    }

    /// Drive the session until the user leaves or the relay goes away.
    pub async fn run(mut self) -> Result<(), MeetError> {
        let mut housekeeping = tokio::time::interval(self.housekeeping_interval);

        loop {
            tokio::select! {
                msg = self.inbound.recv() => match msg {
                    Some(msg) => self.handle_control(msg).await,
                    None => {
                        warn!("Signaling channel lost, leaving {}", self.meeting_id);
                        self.leave().await;
                        return Err(MeetError::Closed);
                    }
                },
                Some(event) = self.link_events.recv() => self.handle_link_event(event).await,
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => self.leave().await,
                },
                _ = housekeeping.tick() => self.housekeeping(Instant::now()).await,
            }

            if self.left {
                return Ok(());
            }
        }
    }

    /// Handle everything already queued without waiting. Returns whether any
    /// input was processed.
    pub async fn step(&mut self) -> bool {
        let mut progressed = false;

        while let Ok(msg) = self.inbound.try_recv() {
            self.handle_control(msg).await;
            progressed = true;
        }
        while let Ok(event) = self.link_events.try_recv() {
            self.handle_link_event(event).await;
            progressed = true;
        }
        while let Ok(cmd) = self.commands.try_recv() {
            self.handle_command(cmd).await;
            progressed = true;
        }
        progressed
    }

    /// Expire stalled negotiations and old reactions.
    pub async fn housekeeping(&mut self, now: Instant) {
        for peer in self.manager.expire_stalled(now).await {
            self.report(MeetError::NegotiationTimeout(peer));
        }
        self.reactions.prune(now_millis());
    }

    pub async fn handle_control(&mut self, msg: ControlMessage) {
        if self.left {
            debug!("Ignoring {} after leave", msg.kind());
            return;
        }
        debug!("{} <- {}", self.local.id, msg.kind());

        match msg {
            ControlMessage::IceConfig { ice_servers } => {
                debug!("Relay announced {} ICE servers", ice_servers.len());
                self.ice_servers = ice_servers;
            }
            ControlMessage::ExistingParticipants { ref participants, .. } => {
                let remotes: Vec<ParticipantId> = participants
                    .iter()
                    .map(|p| p.id.clone())
                    .filter(|id| *id != self.local.id)
                    .collect();
                self.presence.apply(&msg);
                self.emit(SessionEvent::ParticipantsChanged);

                for remote in remotes {
                    if let Err(e) = self.manager.on_peer_joined(&remote).await {
                        self.report(e);
                    }
                }
            }
            ControlMessage::ParticipantJoined(ref info) => {
                if info.id == self.local.id {
                    return;
                }
                let remote = info.id.clone();
                if self.presence.apply(&msg) {
                    self.emit(SessionEvent::ParticipantsChanged);
                }
                if let Err(e) = self.manager.on_peer_joined(&remote).await {
                    self.report(e);
                }
            }
            ControlMessage::ParticipantLeft { ref id } => {
                self.manager.on_peer_left(id).await;
                if self.presence.apply(&msg) {
                    self.emit(SessionEvent::ParticipantsChanged);
                }
            }
            ControlMessage::Offer { from, sdp, .. } => {
                let Some(from) = from else {
                    warn!("Dropping offer without sender");
                    return;
                };
                if let Err(e) = self.manager.on_offer_received(&from, sdp).await {
                    self.report(e);
                }
            }
            ControlMessage::Answer { from, sdp, .. } => {
                let Some(from) = from else {
                    warn!("Dropping answer without sender");
                    return;
                };
                if let Err(e) = self.manager.on_answer_received(&from, sdp).await {
                    self.report(e);
                }
            }
            ControlMessage::IceCandidate {
                from, candidate, ..
            } => {
                let Some(from) = from else {
                    warn!("Dropping ICE candidate without sender");
                    return;
                };
                if let Err(e) = self.manager.on_ice_candidate(&from, candidate).await {
                    self.report(e);
                }
            }
            ControlMessage::ChatMessage {
                user_id,
                message,
                timestamp,
                ..
            } => {
                let entry = ChatEntry {
                    from: user_id,
                    message,
                    timestamp,
                };
                self.chat.push(entry.clone());
                self.emit(SessionEvent::ChatReceived(entry));
            }
            ControlMessage::Reaction {
                user_id,
                kind,
                timestamp,
                ..
            } => {
                let entry = ReactionEntry {
                    from: user_id,
                    kind,
                    timestamp,
                };
                self.reactions.push(entry.clone());
                self.emit(SessionEvent::ReactionReceived(entry));
            }
            ControlMessage::ParticipantUpdated(_)
            | ControlMessage::RaiseHand { .. }
            | ControlMessage::AudioToggle { .. }
            | ControlMessage::VideoToggle { .. }
            | ControlMessage::ScreenShareStarted { .. }
            | ControlMessage::ScreenShareStopped { .. } => {
                if self.presence.apply(&msg) {
                    self.emit(SessionEvent::ParticipantsChanged);
                }
            }
            ControlMessage::Error { code, message } => {
                warn!("Relay rejected a message ({:?}): {}", code, message);
                self.emit(SessionEvent::RelayError { code, message });
            }
            ControlMessage::Join { .. } | ControlMessage::Leave { .. } => {
                debug!("Ignoring client-only {} from relay", msg.kind());
            }
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        if let Err(e) = self.manager.on_link_event(event).await {
            self.report(e);
        }
    }

    pub async fn handle_command(&mut self, cmd: SessionCommand) {
        if self.left {
            debug!("Ignoring {:?} after leave", cmd);
            return;
        }

        match cmd {
            SessionCommand::ToggleAudio(enabled) => {
                self.manager.toggle_audio(enabled);
                self.reflect_local(|p| p.audio = enabled);
            }
            SessionCommand::ToggleVideo(enabled) => {
                self.manager.toggle_video(enabled);
                self.reflect_local(|p| p.video = enabled);
            }
            SessionCommand::StartScreenShare => match self.manager.start_screen_share().await {
                Ok(()) => self.reflect_local(|p| p.screen_sharing = true),
                Err(e) => self.report(e),
            },
            SessionCommand::StopScreenShare => {
                self.manager.stop_screen_share().await;
                self.reflect_local(|p| p.screen_sharing = false);
            }
            SessionCommand::SendChat(message) => {
                let timestamp = now_millis();
                self.send(ControlMessage::ChatMessage {
                    meeting_id: self.meeting_id.clone(),
                    user_id: self.local.id.clone(),
                    message: message.clone(),
                    timestamp,
                });
                self.chat.push(ChatEntry {
                    from: self.local.id.clone(),
                    message,
                    timestamp,
                });
            }
            SessionCommand::SendReaction(kind) => {
                let timestamp = now_millis();
                self.send(ControlMessage::Reaction {
                    meeting_id: self.meeting_id.clone(),
                    user_id: self.local.id.clone(),
                    kind: kind.clone(),
                    timestamp,
                });
                self.reactions.push(ReactionEntry {
                    from: self.local.id.clone(),
                    kind,
                    timestamp,
                });
            }
            SessionCommand::RaiseHand(raised) => {
                self.send(ControlMessage::RaiseHand {
                    meeting_id: self.meeting_id.clone(),
                    user_id: self.local.id.clone(),
                    raised,
                });
                self.reflect_local(|p| p.hand_raised = raised);
            }
            SessionCommand::Leave => self.leave().await,
        }
    }

    /// Close every link, release capture and tell the relay. Idempotent.
    pub async fn leave(&mut self) {
        if self.left {
            return;
        }
        self.manager.leave().await;
        self.presence.clear();
        self.left = true;
        self.emit(SessionEvent::Left);
    }

    /// Whether local capture currently provides a track of `kind`.
    pub fn is_capturing(&self, kind: TrackKind) -> bool {
        let local = self.manager.local_media();
        match kind {
            TrackKind::Audio => local.audio.is_some(),
            TrackKind::Video => local.video.is_some(),
        }
    }

    fn reflect_local(&mut self, f: impl FnOnce(&mut ParticipantInfo)) {
        f(&mut self.local);
        self.presence.insert(self.local.clone());
    }

    fn send(&self, msg: ControlMessage) {
        let kind = msg.kind();
        if let Err(e) = self.signaling.send(msg) {
            warn!("Failed to send {}: {}", kind, e);
        }
    }

    fn report(&self, err: MeetError) {
        let event = match err {
            MeetError::StaleMessageIgnored { .. } => {
                debug!("{}", err);
                return;
            }
            MeetError::NegotiationTimeout(peer) => SessionEvent::NegotiationTimeout(peer),
            MeetError::NegotiationFailed { peer, reason } => {
                SessionEvent::PeerFailed { peer, reason }
            }
            MeetError::MediaUnavailable(reason) => SessionEvent::MediaUnavailable(reason),
            other => {
                warn!("Session error: {}", other);
                return;
            }
        };
        self.emit(event);
    }

    fn emit(&self, event: SessionEvent) {
        // The UI may have stopped listening; the session carries on regardless.
        let _ = self.events.send(event);
    }
}
