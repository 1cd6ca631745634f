use thiserror::Error;

/// Result type for SoundTouch operations
pub type Result<T> = std::result::Result<T, SoundTouchError>;

/// Errors that can occur when talking to SoundTouch speakers
#[derive(Error, Debug)]
pub enum SoundTouchError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection was closed before the operation could complete
    #[error("Connection closed")]
    ConnectionClosed,

    /// The session has no open transport
    #[error("Session is not connected")]
    NotConnected,

    /// `connect` was called on a session that is not in the unconnected state
    #[error("Session is already connected or connecting")]
    AlreadyConnected,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// No traffic was received from the device within the heartbeat timeout
    #[error("No traffic from device within {0:?}")]
    LivenessTimeout(std::time::Duration),

    /// Underlying transport reported a failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Inbound payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid or unexpected value in a device document
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A coalesced request failed because the wire request it joined failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}
