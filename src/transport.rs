//! The seam between a session and whatever carries its bytes.
//!
//! A [`Connector`] opens a duplex channel to a device address and returns a
//! [`TransportHandle`]: a [`Link`] for outbound writes and a receiver of
//! [`TransportEvent`]s for everything coming back. The WebSocket
//! implementation lives in [`WebSocketConnector`](crate::WebSocketConnector);
//! tests plug in an in-memory one.

use crate::config::SessionConfig;
use crate::error::{Result, SoundTouchError};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Something the transport reports to the session
#[derive(Debug)]
pub enum TransportEvent {
    /// A raw inbound payload
    Message(Vec<u8>),
    /// The channel failed; a `Closed` follows
    Error(String),
    /// The channel is gone
    Closed,
}

/// Instruction for the task driving the write side of a transport
#[derive(Debug)]
pub enum LinkCommand {
    /// Write a payload, acknowledging the outcome when `ack` is set
    Write {
        payload: String,
        ack: Option<oneshot::Sender<Result<()>>>,
    },
    /// Close the channel now
    Close,
}

/// Write half of an open transport
#[derive(Debug, Clone)]
pub struct Link {
    commands: mpsc::UnboundedSender<LinkCommand>,
}

impl Link {
    /// Create a link together with the receiver a transport task drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LinkCommand>) {
        let (commands, rx) = mpsc::unbounded_channel();
        (Self { commands }, rx)
    }

    /// Write a payload and wait for the transport to acknowledge it
    pub async fn write(&self, payload: impl Into<String>) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.commands
            .send(LinkCommand::Write {
                payload: payload.into(),
                ack: Some(ack),
            })
            .map_err(|_| SoundTouchError::ConnectionClosed)?;

        rx.await.map_err(|_| SoundTouchError::ConnectionClosed)?
    }

    /// Queue a payload without waiting for the write to complete
    pub fn write_detached(&self, payload: impl Into<String>) -> Result<()> {
        self.commands
            .send(LinkCommand::Write {
                payload: payload.into(),
                ack: None,
            })
            .map_err(|_| SoundTouchError::ConnectionClosed)
    }

    /// Tear the channel down
    pub fn force_close(&self) {
        let _ = self.commands.send(LinkCommand::Close);
    }
}

/// An open transport
#[derive(Debug)]
pub struct TransportHandle {
    pub link: Link,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens transports to device addresses
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a channel to `address`, resolving once it is usable
    async fn open(&self, address: &str, config: &SessionConfig) -> Result<TransportHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_waits_for_ack() {
        let (link, mut commands) = Link::channel();

        let writer = tokio::spawn(async move { link.write("info").await });

        match commands.recv().await {
            Some(LinkCommand::Write { payload, ack: Some(ack) }) => {
                assert_eq!(payload, "info");
                ack.send(Err(SoundTouchError::Transport("refused".to_string()))).unwrap();
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(matches!(writer.await.unwrap(), Err(SoundTouchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_write_fails_once_transport_is_gone() {
        let (link, commands) = Link::channel();
        drop(commands);

        assert!(matches!(link.write("info").await, Err(SoundTouchError::ConnectionClosed)));
        assert!(link.write_detached("info").is_err());
    }
}
