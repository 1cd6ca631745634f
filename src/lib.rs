//! Rust library for discovering and controlling Bose SoundTouch networked speakers
//!
//! This library provides an async client for the speakers' local WebSocket
//! control protocol. It supports:
//!
//! - Discovery of speakers from local network service announcements
//! - A persistent session per speaker with keepalive monitoring
//! - Fetching device state: info, now playing, volume, bass, bass
//!   capabilities, presets, sources, zone and track info
//! - Real-time state updates pushed by the speaker
//!
//! # Quick Start
//!
//! ```no_run
//! use soundtouch::{DeviceSession, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = DeviceSession::new("192.168.1.40");
//!     let mut events = session.subscribe();
//!     session.connect().await?;
//!
//!     // Fetch everything once
//!     let state = session.update_all().await?;
//!     println!("Volume: {:?}", state.volume);
//!
//!     // Then follow pushed updates
//!     while let Ok(event) = events.recv().await {
//!         if let SessionEvent::Volume(volume) = event {
//!             println!("Volume changed: {}", volume);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Discovery**: turns add/remove service announcements into sessions
//! - **Session**: connection lifecycle, request/reply matching and state
//! - **Liveness**: keepalive probes and dead-link detection
//! - **Classifier**: routes decoded documents to category handlers
//! - **Decoder**: XML payloads to `serde_json::Value` trees
//! - **Transport**: the connector seam, with a WebSocket implementation

mod classifier;
mod config;
mod connection;
mod correlator;
mod decoder;
mod discovery;
mod error;
mod liveness;
mod protocol;
mod session;
mod subscription;
mod transport;
mod types;

// Public exports
pub use classifier::{classify, Dispatch};
pub use config::{DiscoveryConfig, SessionConfig, SOUNDTOUCH_SERVICE_TYPE};
pub use connection::WebSocketConnector;
pub use decoder::{decode, Document, TEXT_KEY};
pub use discovery::{ChannelBrowser, Discovery, DiscoveryEvent, ServiceBrowser, ServiceEvent};
pub use error::{Result, SoundTouchError};
pub use protocol::{Category, PING_REQUEST};
pub use session::DeviceSession;
pub use subscription::{EventReceiver, SessionEvent};
pub use transport::{Connector, Link, LinkCommand, TransportEvent, TransportHandle};
pub use types::{
    Bass, DeviceAddress, DeviceInfo, DeviceState, NowPlaying, SessionState, Volume,
};
