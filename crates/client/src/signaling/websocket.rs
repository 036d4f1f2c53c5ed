//! WebSocket signaling channel built on tokio-tungstenite.

use super::{SignalingChannel, SignalingConnector};
use crate::events::SignalingEvents;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// [`SignalingConnector`] producing one [`WebSocketChannel`] per attempt.
#[derive(Debug, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

impl SignalingConnector for WebSocketConnector {
    fn open(&self, url: &str, events: SignalingEvents) -> Arc<dyn SignalingChannel> {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = watch::channel(false);

        tokio::spawn(run_channel(url.to_string(), events, out_rx, close_rx));

        Arc::new(WebSocketChannel { out_tx, close_tx })
    }
}

/// Handle to one WebSocket signaling connection.
pub struct WebSocketChannel {
    out_tx: mpsc::UnboundedSender<String>,
    close_tx: watch::Sender<bool>,
}

#[async_trait]
impl SignalingChannel for WebSocketChannel {
    fn send(&self, payload: String) {
        if self.out_tx.send(payload).is_err() {
            debug!("dropping payload for a channel that is already down");
        }
    }

    async fn close(&self) {
        let _ = self.close_tx.send(true);
    }
}

/// I/O task for one channel: connects, reports `opened`, then pumps frames
/// both ways until the server closes, an error occurs, or a local close is
/// requested. A local close produces no event; the requester already knows.
async fn run_channel(
    url: String,
    events: SignalingEvents,
    mut out_rx: mpsc::UnboundedReceiver<String>,
    mut close_rx: watch::Receiver<bool>,
) {
    let ws_stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _)) => stream,
            Err(e) => {
                warn!(error = %e, url = %url, "failed to connect to signaling server");
                events.errored();
                return;
            }
        },
        _ = close_rx.changed() => return,
    };

    debug!(url = %url, "signaling channel open");
    events.opened();

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => events.message(text),
                Some(Ok(Message::Close(_))) | None => {
                    debug!("signaling channel closed by server");
                    events.closed();
                    break;
                }
                // Ping/pong are handled by the library; binary frames are
                // not part of this protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "signaling channel error");
                    events.errored();
                    break;
                }
            },
            payload = out_rx.recv() => match payload {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!(error = %e, "failed to send signaling payload");
                        events.errored();
                        break;
                    }
                }
                // All senders dropped; the handle is gone.
                None => break,
            },
            _ = close_rx.changed() => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }
}
