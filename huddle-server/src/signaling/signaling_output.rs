use async_trait::async_trait;
use huddle_core::ControlMessage;
use tokio::sync::mpsc;

/// Outbound half of one client's signaling channel, as seen by a room.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Queue a message for the client. Returns `false` once the client is gone.
    async fn deliver(&self, msg: ControlMessage) -> bool;
}

#[async_trait]
impl SignalingOutput for mpsc::UnboundedSender<ControlMessage> {
    async fn deliver(&self, msg: ControlMessage) -> bool {
        self.send(msg).is_ok()
    }
}
