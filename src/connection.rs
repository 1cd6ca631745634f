use crate::config::SessionConfig;
use crate::error::{Result, SoundTouchError};
use crate::transport::{Connector, Link, LinkCommand, TransportEvent, TransportHandle};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket transport to a speaker's local control port
///
/// Connects to `ws://<address>:<port>` offering the configured subprotocol
/// (`gabbo` by default), then runs one task for writes and one for reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, address: &str, config: &SessionConfig) -> Result<TransportHandle> {
        let url = format!("ws://{}:{}", address, config.port);
        tracing::info!("Connecting to {}", url);

        let mut request = url.as_str().into_client_request()?;
        let protocol = HeaderValue::from_str(&config.subprotocol)
            .map_err(|e| SoundTouchError::Transport(format!("Invalid subprotocol: {}", e)))?;
        request.headers_mut().insert("Sec-WebSocket-Protocol", protocol);

        let (ws_stream, _) = connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        let (link, mut commands) = Link::channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        // Forward link commands to the WebSocket
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                match command {
                    LinkCommand::Write { payload, ack } => {
                        tracing::debug!(target: "soundtouch::send", "Sending: {}", payload);
                        let result = write
                            .send(Message::Text(payload))
                            .await
                            .map_err(SoundTouchError::from);

                        let failed = result.is_err();
                        if let Err(e) = &result {
                            tracing::error!("Failed to send message: {}", e);
                        }
                        if let Some(ack) = ack {
                            let _ = ack.send(result);
                        }
                        if failed {
                            break;
                        }
                    }
                    LinkCommand::Close => {
                        tracing::debug!("Closing WebSocket on request");
                        break;
                    }
                }
            }

            let _ = write.close().await;
            let _ = stop_tx.send(());
        });

        // Translate incoming frames into transport events
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    msg = read.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            if events_tx.send(TransportEvent::Message(text.into_bytes())).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if events_tx.send(TransportEvent::Message(data)).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("WebSocket connection closed");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("WebSocket error: {}", e);
                            let _ = events_tx.send(TransportEvent::Error(e.to_string()));
                            break;
                        }
                        None => break,
                    }
                }
            }

            let _ = events_tx.send(TransportEvent::Closed);
        });

        Ok(TransportHandle { link, events })
    }
}
