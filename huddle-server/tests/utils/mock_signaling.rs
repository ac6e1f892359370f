use async_trait::async_trait;
use huddle_core::ControlMessage;
use huddle_server::SignalingOutput;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Mock SignalingOutput that captures everything a room delivers to one client.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to send captured messages.
    tx: mpsc::UnboundedSender<ControlMessage>,
    /// All captured messages (for verification).
    delivered: Arc<Mutex<Vec<ControlMessage>>>,
}

impl MockSignalingOutput {
    /// Create a new MockSignalingOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ControlMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = Self {
            tx,
            delivered: Arc::new(Mutex::new(Vec::new())),
        };
        (output, rx)
    }

    /// Every message delivered so far.
    pub async fn delivered(&self) -> Vec<ControlMessage> {
        self.delivered.lock().await.clone()
    }

    /// Number of delivered messages with the given wire tag.
    pub async fn count_kind(&self, kind: &str) -> usize {
        self.delivered
            .lock()
            .await
            .iter()
            .filter(|m| m.kind() == kind)
            .count()
    }
}

#[async_trait]
impl SignalingOutput for MockSignalingOutput {
    async fn deliver(&self, msg: ControlMessage) -> bool {
        tracing::debug!("[MockSignaling] deliver {}", msg.kind());

        self.delivered.lock().await.push(msg.clone());
        self.tx.send(msg).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_signaling_captures_messages() {
        let (output, mut rx) = MockSignalingOutput::new();
        let msg = ControlMessage::ParticipantLeft { id: "bob".into() };

        assert!(output.deliver(msg.clone()).await);

        assert_eq!(rx.recv().await, Some(msg));
        assert_eq!(output.count_kind("participant-left").await, 1);
    }
}
