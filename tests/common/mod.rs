//! In-memory transport for driving sessions in tests.
//!
//! `MockConnector` hands every opened transport to the test as a
//! `MockDevice`, which sees what the session writes and can push messages,
//! errors and closes back.

#![allow(dead_code)]

use async_trait::async_trait;
use soundtouch::{
    Connector, DeviceSession, Link, LinkCommand, SessionConfig, SoundTouchError, TransportEvent,
    TransportHandle,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const ADDRESS: &str = "10.0.0.5";

pub struct MockConnector {
    devices: mpsc::UnboundedSender<MockDevice>,
    refuse: AtomicBool,
    hang: AtomicBool,
    fail_writes: Arc<AtomicBool>,
    stall_writes: Arc<AtomicBool>,
}

impl MockConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockDevice>) {
        let (devices, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                devices,
                refuse: AtomicBool::new(false),
                hang: AtomicBool::new(false),
                fail_writes: Arc::new(AtomicBool::new(false)),
                stall_writes: Arc::new(AtomicBool::new(false)),
            }),
            rx,
        )
    }

    pub fn refuse_connections(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    /// Make `open` wait forever
    pub fn hang_connections(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Accept writes but never acknowledge them
    pub fn stall_writes(&self, stall: bool) {
        self.stall_writes.store(stall, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, address: &str, _config: &SessionConfig) -> soundtouch::Result<TransportHandle> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(SoundTouchError::Transport(format!("{} refused connection", address)));
        }
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let (link, mut commands) = Link::channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let (writes_tx, writes) = mpsc::unbounded_channel();
        let closes = Arc::new(AtomicUsize::new(0));

        let fail_writes = self.fail_writes.clone();
        let stall_writes = self.stall_writes.clone();
        let closes_clone = closes.clone();
        let events_clone = events_tx.clone();
        tokio::spawn(async move {
            let mut stalled = Vec::new();
            while let Some(command) = commands.recv().await {
                match command {
                    LinkCommand::Write { payload, ack } if stall_writes.load(Ordering::SeqCst) => {
                        let _ = writes_tx.send(payload);
                        stalled.extend(ack);
                    }
                    LinkCommand::Write { payload, ack } => {
                        let result = if fail_writes.load(Ordering::SeqCst) {
                            Err(SoundTouchError::Transport("write failed".to_string()))
                        } else {
                            let _ = writes_tx.send(payload);
                            Ok(())
                        };
                        if let Some(ack) = ack {
                            let _ = ack.send(result);
                        }
                    }
                    LinkCommand::Close => {
                        closes_clone.fetch_add(1, Ordering::SeqCst);
                        let _ = events_clone.send(TransportEvent::Closed);
                    }
                }
            }
        });

        let _ = self.devices.send(MockDevice {
            writes,
            events: events_tx,
            closes,
        });

        Ok(TransportHandle { link, events })
    }
}

/// The device end of one mock transport
pub struct MockDevice {
    writes: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
    closes: Arc<AtomicUsize>,
}

impl MockDevice {
    /// Wait for the next payload the session writes
    pub async fn next_write(&mut self) -> String {
        tokio::time::timeout(Duration::from_secs(60), self.writes.recv())
            .await
            .expect("timed out waiting for a write")
            .expect("transport dropped")
    }

    /// A payload already written, if any
    pub fn try_write(&mut self) -> Option<String> {
        self.writes.try_recv().ok()
    }

    pub fn push(&self, xml: &str) {
        let _ = self.events.send(TransportEvent::Message(xml.as_bytes().to_vec()));
    }

    pub fn error(&self, cause: &str) {
        let _ = self.events.send(TransportEvent::Error(cause.to_string()));
    }

    pub fn hang_up(&self) {
        let _ = self.events.send(TransportEvent::Closed);
    }

    /// How many times the session force-closed this transport
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Create a session over a mock transport and connect it
pub async fn connected_session(config: SessionConfig) -> (DeviceSession, MockDevice, Arc<MockConnector>) {
    let (connector, mut devices) = MockConnector::new();
    let session = DeviceSession::with_connector(ADDRESS, config, connector.clone());
    session.connect().await.expect("connect failed");
    let device = devices.recv().await.expect("no transport opened");
    (session, device, connector)
}

/// Let spawned tasks run
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
