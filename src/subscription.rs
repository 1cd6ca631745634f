use crate::error::{Result, SoundTouchError};
use crate::protocol::Category;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Event published by a [`DeviceSession`](crate::DeviceSession)
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Transport opened
    Connected,
    /// Session reached its terminal state
    Closed,
    /// Transport or liveness failure
    Error(Arc<SoundTouchError>),

    Info(Value),
    NowPlaying(Value),
    Volume(Value),
    Bass(Value),
    BassCapabilities(Value),
    Presets(Value),
    Sources(Value),
    Zone(Value),
    TrackInfo(Value),
}

impl SessionEvent {
    /// Build the event announcing a new value for `category`
    pub fn for_category(category: Category, value: Value) -> Self {
        match category {
            Category::Info => SessionEvent::Info(value),
            Category::NowPlaying => SessionEvent::NowPlaying(value),
            Category::Volume => SessionEvent::Volume(value),
            Category::Bass => SessionEvent::Bass(value),
            Category::BassCapabilities => SessionEvent::BassCapabilities(value),
            Category::Presets => SessionEvent::Presets(value),
            Category::Sources => SessionEvent::Sources(value),
            Category::Zone => SessionEvent::Zone(value),
            Category::TrackInfo => SessionEvent::TrackInfo(value),
        }
    }

    /// The category and value carried, for state-change events
    pub fn category_value(&self) -> Option<(Category, &Value)> {
        match self {
            SessionEvent::Info(v) => Some((Category::Info, v)),
            SessionEvent::NowPlaying(v) => Some((Category::NowPlaying, v)),
            SessionEvent::Volume(v) => Some((Category::Volume, v)),
            SessionEvent::Bass(v) => Some((Category::Bass, v)),
            SessionEvent::BassCapabilities(v) => Some((Category::BassCapabilities, v)),
            SessionEvent::Presets(v) => Some((Category::Presets, v)),
            SessionEvent::Sources(v) => Some((Category::Sources, v)),
            SessionEvent::Zone(v) => Some((Category::Zone, v)),
            SessionEvent::TrackInfo(v) => Some((Category::TrackInfo, v)),
            SessionEvent::Connected | SessionEvent::Closed | SessionEvent::Error(_) => None,
        }
    }
}

/// Receiver for session or discovery events
///
/// Publishing never fails for lack of receivers; a receiver only sees events
/// sent after it subscribed.
pub struct EventReceiver<T> {
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> EventReceiver<T> {
    pub(crate) fn new(rx: broadcast::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Receive the next event
    ///
    /// Fails with `ConnectionClosed` once the publisher is gone.
    pub async fn recv(&mut self) -> Result<T> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => SoundTouchError::ConnectionClosed,
            broadcast::error::RecvError::Lagged(n) => {
                SoundTouchError::ChannelError(format!("Lagged by {} messages", n))
            }
        })
    }

    /// Try to receive an event without waiting
    ///
    /// Returns `None` if no event is available.
    pub fn try_recv(&mut self) -> Result<Option<T>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(SoundTouchError::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(SoundTouchError::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}
