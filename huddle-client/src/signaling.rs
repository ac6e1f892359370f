use crate::error::MeetError;
use futures::{SinkExt, StreamExt};
use huddle_core::ControlMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Outbound half of the signaling channel. Sends are fire-and-continue.
pub trait SignalSender: Send + Sync {
    fn send(&self, msg: ControlMessage) -> Result<(), MeetError>;
}

impl SignalSender for mpsc::UnboundedSender<ControlMessage> {
    fn send(&self, msg: ControlMessage) -> Result<(), MeetError> {
        mpsc::UnboundedSender::send(self, msg).map_err(|_| MeetError::Closed)
    }
}

/// Websocket connection to the relay.
///
/// Outgoing messages go through [`SignalingClient::sender`]; incoming ones are
/// decoded and delivered on the receiver returned by [`SignalingClient::connect`].
pub struct SignalingClient {
    send_tx: mpsc::UnboundedSender<ControlMessage>,
    reader: JoinHandle<()>,
}

impl SignalingClient {
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ControlMessage>), MeetError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| MeetError::SignalingUnreachable(format!("{url}: {e}")))?;
        info!("Signaling channel connected to {}", url);

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (send_tx, mut send_rx) = mpsc::unbounded_channel::<ControlMessage>();
        let (recv_tx, recv_rx) = mpsc::unbounded_channel::<ControlMessage>();

        // Runs until every sender is dropped, so a final `leave` is still flushed.
        tokio::spawn(async move {
            while let Some(msg) = send_rx.recv().await {
                let json = match msg.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize {}: {}", msg.kind(), e);
                        continue;
                    }
                };
                if ws_write.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_write.send(Message::Close(None)).await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_read.next().await {
                match frame {
                    Ok(Message::Text(text)) => match ControlMessage::from_json(text.as_str()) {
                        Ok(msg) => {
                            if recv_tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping undecodable control message: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Signaling read error: {}", e);
                        break;
                    }
                }
            }
            info!("Signaling channel closed");
        });

        Ok((
            Self { send_tx, reader },
            recv_rx,
        ))
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<ControlMessage> {
        self.send_tx.clone()
    }
}

impl Drop for SignalingClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
