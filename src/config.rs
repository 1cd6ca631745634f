use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SUBPROTOCOL: &str = "gabbo";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const SEND_TIMEOUT: Duration = Duration::from_secs(5);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_CAPACITY: usize = 100;

/// mDNS service type SoundTouch speakers announce themselves under
pub const SOUNDTOUCH_SERVICE_TYPE: &str = "_soundtouch._tcp";

/// Tunables for a [`DeviceSession`](crate::DeviceSession)
///
/// # Example
///
/// ```
/// use soundtouch::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::default()
///     .with_heartbeat(Duration::from_secs(5), Duration::from_secs(15))
///     .with_request_timeout(None);
/// assert_eq!(config.heartbeat_interval, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket port on the speaker
    pub port: u16,
    /// WebSocket subprotocol offered during the handshake
    pub subprotocol: String,
    /// Maximum time to wait for the transport to open
    pub connect_timeout: Duration,
    /// Maximum time to wait for a write acknowledgement
    pub send_timeout: Duration,
    /// Period between keepalive probes while the link is quiet
    pub heartbeat_interval: Duration,
    /// Maximum silence before the link is declared dead
    pub heartbeat_timeout: Duration,
    /// Maximum time a category request waits for its reply (`None` waits until close)
    pub request_timeout: Option<Duration>,
    /// Buffer size of the session event broadcast channel
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            subprotocol: DEFAULT_SUBPROTOCOL.to_string(),
            connect_timeout: CONNECT_TIMEOUT,
            send_timeout: SEND_TIMEOUT,
            heartbeat_interval: HEARTBEAT_INTERVAL,
            heartbeat_timeout: HEARTBEAT_TIMEOUT,
            request_timeout: Some(REQUEST_TIMEOUT),
            event_capacity: EVENT_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Set the WebSocket port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the WebSocket subprotocol
    pub fn with_subprotocol(mut self, subprotocol: impl Into<String>) -> Self {
        self.subprotocol = subprotocol.into();
        self
    }

    /// Set the connect and send timeouts
    pub fn with_io_timeouts(mut self, connect: Duration, send: Duration) -> Self {
        self.connect_timeout = connect;
        self.send_timeout = send;
        self
    }

    /// Set the heartbeat interval and the silence timeout
    pub fn with_heartbeat(mut self, interval: Duration, timeout: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.heartbeat_timeout = timeout;
        self
    }

    /// Set the per-request reply timeout
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

/// Tunables for [`Discovery`](crate::Discovery)
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Service type passed to the announcement source
    pub service_type: String,
    /// Configuration handed to every session discovery creates
    pub session: SessionConfig,
    /// Buffer size of the discovery event broadcast channel
    pub event_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: SOUNDTOUCH_SERVICE_TYPE.to_string(),
            session: SessionConfig::default(),
            event_capacity: EVENT_CAPACITY,
        }
    }
}

impl DiscoveryConfig {
    /// Set the configuration used for discovered sessions
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}
