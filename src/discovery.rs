use crate::config::DiscoveryConfig;
use crate::connection::WebSocketConnector;
use crate::error::{Result, SoundTouchError};
use crate::session::DeviceSession;
use crate::subscription::EventReceiver;
use crate::transport::Connector;
use crate::types::DeviceAddress;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Announcement from the local network service browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceEvent {
    /// A service appeared
    Added { name: String, address: DeviceAddress },
    /// A service went away
    Removed { address: DeviceAddress },
}

/// Source of service announcements (typically an mDNS browser)
#[async_trait]
pub trait ServiceBrowser: Send + Sync + 'static {
    /// Start browsing for `service_type`
    ///
    /// Browsing ends when the returned receiver is dropped or the sender side
    /// finishes.
    async fn browse(&self, service_type: &str) -> Result<mpsc::Receiver<ServiceEvent>>;
}

/// Service browser fed through a channel
///
/// Lets any mDNS implementation, or a static list of speakers, drive
/// [`Discovery`]. The receiving side can be browsed once.
pub struct ChannelBrowser {
    rx: Mutex<Option<mpsc::Receiver<ServiceEvent>>>,
}

impl ChannelBrowser {
    /// Create a browser and the sender that feeds it
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<ServiceEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl ServiceBrowser for ChannelBrowser {
    async fn browse(&self, service_type: &str) -> Result<mpsc::Receiver<ServiceEvent>> {
        tracing::debug!("Browsing for {} on channel", service_type);
        self.rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| SoundTouchError::ChannelError("Channel browser already consumed".to_string()))
    }
}

/// Event published by [`Discovery`]
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A speaker appeared; the session is not connected
    DeviceFound(DeviceSession),
    /// The speaker at this address went away
    DeviceLost(DeviceAddress),
}

/// Turns service announcements into device sessions
///
/// Every announced speaker yields a fresh, unconnected [`DeviceSession`].
/// Connecting it and closing it are up to the caller; a removal
/// announcement only reports the address.
///
/// # Example
///
/// ```no_run
/// use soundtouch::{ChannelBrowser, Discovery, DiscoveryEvent, ServiceEvent};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let (browser, announcements) = ChannelBrowser::new(16);
///     let mut discovery = Discovery::new(Arc::new(browser));
///     let mut events = discovery.subscribe();
///     discovery.start().await?;
///
///     announcements
///         .send(ServiceEvent::Added { name: "Den".into(), address: "10.0.0.5".into() })
///         .await?;
///
///     if let DiscoveryEvent::DeviceFound(session) = events.recv().await? {
///         session.connect().await?;
///     }
///
///     discovery.stop().await;
///     Ok(())
/// }
/// ```
pub struct Discovery {
    config: DiscoveryConfig,
    browser: Arc<dyn ServiceBrowser>,
    connector: Arc<dyn Connector>,
    events: broadcast::Sender<DiscoveryEvent>,
    stop_tx: Option<broadcast::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Discovery {
    /// Create a discovery service over `browser` producing WebSocket sessions
    pub fn new(browser: Arc<dyn ServiceBrowser>) -> Self {
        Self::with_config(browser, DiscoveryConfig::default(), Arc::new(WebSocketConnector))
    }

    /// Create a discovery service with custom settings and transport
    pub fn with_config(
        browser: Arc<dyn ServiceBrowser>,
        config: DiscoveryConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            browser,
            connector,
            events,
            stop_tx: None,
            task_handle: None,
        }
    }

    /// Subscribe to found/lost events
    pub fn subscribe(&self) -> EventReceiver<DiscoveryEvent> {
        EventReceiver::new(self.events.subscribe())
    }

    /// Whether the announcement listener is running
    pub fn is_running(&self) -> bool {
        self.task_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Start listening for announcements
    ///
    /// If discovery is already running, it is stopped and restarted.
    pub async fn start(&mut self) -> Result<()> {
        self.stop().await;

        let mut announcements = self.browser.browse(&self.config.service_type).await?;
        tracing::info!("starting scanning for {}", self.config.service_type);

        let (stop_tx, mut stop_rx) = broadcast::channel(1);
        self.stop_tx = Some(stop_tx);

        let events = self.events.clone();
        let connector = self.connector.clone();
        let session_config = self.config.session.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_rx.recv() => {
                        tracing::info!("Discovery stopped by user");
                        break;
                    }
                    announcement = announcements.recv() => match announcement {
                        Some(ServiceEvent::Added { name, address }) => {
                            tracing::info!("found new device {} ({})", name, address);
                            let session = DeviceSession::with_connector(
                                address,
                                session_config.clone(),
                                connector.clone(),
                            );
                            let _ = events.send(DiscoveryEvent::DeviceFound(session));
                        }
                        Some(ServiceEvent::Removed { address }) => {
                            tracing::info!("lost device at {}", address);
                            let _ = events.send(DiscoveryEvent::DeviceLost(address));
                        }
                        None => {
                            tracing::info!("Announcement source ended");
                            break;
                        }
                    }
                }
            }
        });

        self.task_handle = Some(handle);
        Ok(())
    }

    /// Stop listening for announcements
    ///
    /// Sessions already handed out are left untouched.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            tracing::debug!("stopping scanning");
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            // Give it a moment to stop gracefully
            let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;
        }
    }
}
