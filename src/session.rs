use crate::classifier::{classify, Dispatch};
use crate::config::SessionConfig;
use crate::connection::WebSocketConnector;
use crate::correlator::{Correlator, Registration};
use crate::decoder;
use crate::error::{Result, SoundTouchError};
use crate::liveness::{LivenessMonitor, Verdict};
use crate::protocol::{Category, PING_REQUEST};
use crate::subscription::{EventReceiver, SessionEvent};
use crate::transport::{Connector, Link, TransportEvent};
use crate::types::{DeviceAddress, DeviceState, SessionState};
use futures_util::future::try_join_all;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc, oneshot, Notify};
use tokio::time::timeout;

/// Connection to one SoundTouch speaker
///
/// A session is created unconnected, connected once with [`connect`], and
/// closed for good by [`close`] or when the transport goes away. Inbound
/// documents update the last-known value of their category, are published
/// as [`SessionEvent`]s and answer pending `get_*` calls.
///
/// Cloning a session yields another handle to the same connection.
///
/// # Example
///
/// ```no_run
/// use soundtouch::DeviceSession;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = DeviceSession::new("192.168.1.40");
///     let mut events = session.subscribe();
///     session.connect().await?;
///
///     let info = session.get_info().await?;
///     println!("Connected to {}", info["name"]);
///
///     while let Ok(event) = events.recv().await {
///         println!("{:?}", event);
///     }
///     Ok(())
/// }
/// ```
///
/// [`connect`]: DeviceSession::connect
/// [`close`]: DeviceSession::close
#[derive(Clone)]
pub struct DeviceSession {
    shared: Arc<Shared>,
}

struct Shared {
    address: DeviceAddress,
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
    /// Wakes the driver task when the session is closed from outside
    shutdown: Notify,
}

struct Inner {
    state: SessionState,
    link: Option<Link>,
    values: DeviceState,
    correlator: Correlator,
}

impl DeviceSession {
    /// Create an unconnected session to a speaker using the WebSocket transport
    pub fn new(address: impl Into<DeviceAddress>) -> Self {
        Self::with_config(address, SessionConfig::default())
    }

    /// Create an unconnected session with custom settings
    pub fn with_config(address: impl Into<DeviceAddress>, config: SessionConfig) -> Self {
        Self::with_connector(address, config, Arc::new(WebSocketConnector))
    }

    /// Create an unconnected session over a custom transport
    pub fn with_connector(
        address: impl Into<DeviceAddress>,
        config: SessionConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                address: address.into(),
                config,
                connector,
                inner: Mutex::new(Inner {
                    state: SessionState::Unconnected,
                    link: None,
                    values: DeviceState::default(),
                    correlator: Correlator::default(),
                }),
                events,
                shutdown: Notify::new(),
            }),
        }
    }

    /// Address this session talks to
    pub fn address(&self) -> &str {
        &self.shared.address
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.inner().state
    }

    /// Subscribe to session events
    ///
    /// Only events published after this call are received.
    pub fn subscribe(&self) -> EventReceiver<SessionEvent> {
        EventReceiver::new(self.shared.events.subscribe())
    }

    /// Last value received for `category`, if any
    pub fn last_value(&self, category: Category) -> Option<Value> {
        self.inner().values.get(category).cloned()
    }

    /// Copy of every last-known value
    pub fn snapshot(&self) -> DeviceState {
        self.inner().values.clone()
    }

    /// Open the transport and start the session
    ///
    /// Resolves once the transport is open. Fails if the transport cannot be
    /// opened within the connect timeout; the session is then closed.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut inner = self.inner();
            match inner.state {
                SessionState::Unconnected => inner.state = SessionState::Connecting,
                SessionState::Closed => return Err(SoundTouchError::ConnectionClosed),
                _ => return Err(SoundTouchError::AlreadyConnected),
            }
        }

        let config = &self.shared.config;
        tracing::info!("Connecting to device at {}", self.shared.address);

        let opened = match timeout(
            config.connect_timeout,
            self.shared.connector.open(&self.shared.address, config),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SoundTouchError::Timeout),
        };

        let handle = match opened {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", self.shared.address, e);
                self.emit(SessionEvent::Error(Arc::new(SoundTouchError::Transport(
                    e.to_string(),
                ))));
                self.finish_close(false);
                return Err(e);
            }
        };

        {
            let mut inner = self.inner();
            if inner.state != SessionState::Connecting {
                // Closed while the transport was opening
                handle.link.force_close();
                return Err(SoundTouchError::ConnectionClosed);
            }
            inner.state = SessionState::Live;
            inner.link = Some(handle.link);
        }

        tracing::info!("Connected to device at {}", self.shared.address);
        self.emit(SessionEvent::Connected);
        tokio::spawn(drive(self.clone(), handle.events));
        Ok(())
    }

    /// Write a raw payload to the device
    ///
    /// Completes when the transport has written it; does not wait for any
    /// reply.
    pub async fn send(&self, payload: impl Into<String>) -> Result<()> {
        let link = self.inner().link.clone().ok_or(SoundTouchError::NotConnected)?;

        match timeout(self.shared.config.send_timeout, link.write(payload)).await {
            Ok(result) => result,
            Err(_) => Err(SoundTouchError::Timeout),
        }
    }

    /// Close the session
    ///
    /// Tears down the transport and fails every pending request with
    /// `ConnectionClosed`. Closing an already closed session does nothing.
    pub fn close(&self) {
        if self.finish_close(true) {
            tracing::info!("Closed session to {}", self.shared.address);
        }
    }

    /// Ask the device for the current value of `category`
    ///
    /// If a request for the category is already in flight the call joins it
    /// instead of sending a second one, and resolves with the same reply.
    pub async fn request(&self, category: Category) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        let registration = {
            let mut inner = self.inner();
            if !inner.state.is_connected() {
                return Err(SoundTouchError::NotConnected);
            }
            inner.correlator.register(category, tx)
        };

        match registration {
            Registration::Issue(generation) => {
                tracing::debug!(target: "soundtouch::send", "requesting [{}]", category.request_token());
                if let Err(e) = self.send(category.request_token()).await {
                    self.inner().correlator.fail(category, generation, &e.to_string());
                    return Err(e);
                }
            }
            Registration::Joined => {
                tracing::debug!("joining in-flight [{}] request", category);
            }
        }

        let reply = match self.shared.config.request_timeout {
            Some(limit) => match timeout(limit, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.inner().correlator.prune(category);
                    return Err(SoundTouchError::Timeout);
                }
            },
            None => rx.await,
        };

        reply.map_err(|_| SoundTouchError::ConnectionClosed)?
    }

    /// Fetch device identity (`info`)
    pub async fn get_info(&self) -> Result<Value> {
        self.request(Category::Info).await
    }

    /// Fetch what is playing (`nowPlaying`)
    pub async fn get_now_playing(&self) -> Result<Value> {
        self.request(Category::NowPlaying).await
    }

    /// Fetch the volume
    pub async fn get_volume(&self) -> Result<Value> {
        self.request(Category::Volume).await
    }

    /// Fetch the bass level
    pub async fn get_bass(&self) -> Result<Value> {
        self.request(Category::Bass).await
    }

    /// Fetch the supported bass range
    pub async fn get_bass_capabilities(&self) -> Result<Value> {
        self.request(Category::BassCapabilities).await
    }

    /// Fetch the stored presets
    pub async fn get_presets(&self) -> Result<Value> {
        self.request(Category::Presets).await
    }

    /// Fetch the available sources
    pub async fn get_sources(&self) -> Result<Value> {
        self.request(Category::Sources).await
    }

    /// Fetch the multi-room zone
    pub async fn get_zone(&self) -> Result<Value> {
        self.request(Category::Zone).await
    }

    /// Fetch the current track details
    pub async fn get_track_info(&self) -> Result<Value> {
        self.request(Category::TrackInfo).await
    }

    /// Request every category at once
    ///
    /// Fails as soon as any single request fails.
    pub async fn update_all(&self) -> Result<DeviceState> {
        let values = try_join_all(Category::ALL.iter().map(|category| self.request(*category))).await?;

        let mut state = DeviceState::default();
        for (category, value) in Category::ALL.into_iter().zip(values) {
            state.set(category, value);
        }
        Ok(state)
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.shared.events.send(event);
    }

    /// Move to `Closed` if not already there
    ///
    /// Returns whether this call made the transition. Only the transition
    /// publishes `Closed` and, when asked, closes the transport.
    fn finish_close(&self, close_link: bool) -> bool {
        let (link, failed) = {
            let mut inner = self.inner();
            if inner.state == SessionState::Closed {
                return false;
            }
            inner.state = SessionState::Closed;
            (inner.link.take(), inner.correlator.close_all())
        };

        if failed > 0 {
            tracing::debug!("Failed {} pending request(s) on close", failed);
        }
        if close_link {
            if let Some(link) = link {
                link.force_close();
            }
        }

        self.shared.shutdown.notify_one();
        self.emit(SessionEvent::Closed);
        true
    }

    fn handle_message(&self, raw: &[u8], monitor: &mut LivenessMonitor) {
        let document = match decoder::decode(raw) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(target: "soundtouch::recv", "Dropping undecodable message: {}", e);
                return;
            }
        };
        tracing::debug!(target: "soundtouch::recv", "received {:?}", document);

        monitor.record_traffic();
        {
            let mut inner = self.inner();
            if inner.state == SessionState::Degraded {
                tracing::info!("Traffic from {} resumed", self.shared.address);
                inner.state = SessionState::Live;
            }
        }

        for dispatch in classify(&document) {
            match dispatch {
                Dispatch::Apply(category, value) => self.apply(category, value),
                Dispatch::Refetch(category) => self.refetch(category),
            }
        }
    }

    fn apply(&self, category: Category, value: Value) {
        tracing::debug!("received [{}]", category);
        self.inner().values.set(category, value.clone());
        self.emit(SessionEvent::for_category(category, value.clone()));

        let resolved = self.inner().correlator.resolve(category, &value);
        if resolved > 0 {
            tracing::trace!("resolved {} waiter(s) for [{}]", resolved, category);
        }
    }

    fn refetch(&self, category: Category) {
        tracing::debug!("[{}] changed, fetching", category);
        let session = self.clone();
        tokio::spawn(async move {
            if let Err(e) = session.request(category).await {
                tracing::debug!("Refetch of [{}] failed: {}", category, e);
            }
        });
    }

    fn heartbeat(&self, degraded: bool) {
        let link = {
            let mut inner = self.inner();
            if degraded && inner.state == SessionState::Live {
                tracing::warn!("Heartbeat overdue for {}", self.shared.address);
                inner.state = SessionState::Degraded;
            }
            inner.link.clone()
        };

        tracing::debug!("sending heartbeat");
        if let Some(link) = link {
            if let Err(e) = link.write_detached(PING_REQUEST) {
                tracing::debug!("Heartbeat not sent: {}", e);
            }
        }
    }
}

impl fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("address", &self.shared.address)
            .field("state", &self.state())
            .finish()
    }
}

/// Per-session task: classifies inbound traffic in arrival order and runs
/// the heartbeat timer
async fn drive(session: DeviceSession, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
    let config = &session.shared.config;
    let mut monitor = LivenessMonitor::start(config.heartbeat_interval, config.heartbeat_timeout);

    loop {
        tokio::select! {
            biased;

            _ = session.shared.shutdown.notified() => break,

            event = events.recv() => match event {
                Some(TransportEvent::Message(raw)) => session.handle_message(&raw, &mut monitor),
                Some(TransportEvent::Error(cause)) => {
                    tracing::warn!("Transport error from {}: {}", session.shared.address, cause);
                    session.emit(SessionEvent::Error(Arc::new(SoundTouchError::Transport(cause))));
                }
                Some(TransportEvent::Closed) | None => {
                    tracing::info!("Transport to {} closed", session.shared.address);
                    session.finish_close(false);
                    break;
                }
            },

            _ = tokio::time::sleep_until(monitor.deadline()) => match monitor.fire() {
                Verdict::Expired { silence } => {
                    tracing::warn!("Heartbeat timeout for {} after {:?}", session.shared.address, silence);
                    session.emit(SessionEvent::Error(Arc::new(SoundTouchError::LivenessTimeout(silence))));
                    session.finish_close(true);
                    break;
                }
                Verdict::Probe { degraded } => session.heartbeat(degraded),
            },
        }
    }

    tracing::debug!("Session driver for {} stopped", session.shared.address);
}
