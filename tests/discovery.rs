mod common;

use common::{settle, MockConnector};
use soundtouch::{
    ChannelBrowser, Discovery, DiscoveryConfig, DiscoveryEvent, ServiceEvent, SessionState,
    SoundTouchError,
};
use std::sync::Arc;

fn added(name: &str, address: &str) -> ServiceEvent {
    ServiceEvent::Added {
        name: name.to_string(),
        address: address.to_string(),
    }
}

fn removed(address: &str) -> ServiceEvent {
    ServiceEvent::Removed {
        address: address.to_string(),
    }
}

#[tokio::test]
async fn test_found_then_lost() {
    let (browser, announcements) = ChannelBrowser::new(8);
    let mut discovery = Discovery::new(Arc::new(browser));
    let mut events = discovery.subscribe();
    discovery.start().await.unwrap();
    assert!(discovery.is_running());

    announcements.send(added("Den", "10.0.0.5")).await.unwrap();
    let session = match events.recv().await.unwrap() {
        DiscoveryEvent::DeviceFound(session) => session,
        other => panic!("unexpected event: {:?}", other),
    };
    assert_eq!(session.address(), "10.0.0.5");
    assert_eq!(session.state(), SessionState::Unconnected);

    announcements.send(removed("10.0.0.5")).await.unwrap();
    match events.recv().await.unwrap() {
        DiscoveryEvent::DeviceLost(address) => assert_eq!(address, "10.0.0.5"),
        other => panic!("unexpected event: {:?}", other),
    }

    settle().await;
    assert!(matches!(events.try_recv(), Ok(None)));
    assert_eq!(session.state(), SessionState::Unconnected);

    discovery.stop().await;
}

#[tokio::test]
async fn test_removal_leaves_connected_session_open() {
    let (connector, mut devices) = MockConnector::new();
    let (browser, announcements) = ChannelBrowser::new(8);
    let mut discovery = Discovery::with_config(Arc::new(browser), DiscoveryConfig::default(), connector);
    let mut events = discovery.subscribe();
    discovery.start().await.unwrap();

    announcements.send(added("Kitchen", "10.0.0.7")).await.unwrap();
    let session = match events.recv().await.unwrap() {
        DiscoveryEvent::DeviceFound(session) => session,
        other => panic!("unexpected event: {:?}", other),
    };
    session.connect().await.unwrap();
    let device = devices.recv().await.unwrap();

    announcements.send(removed("10.0.0.7")).await.unwrap();
    assert!(matches!(events.recv().await, Ok(DiscoveryEvent::DeviceLost(_))));

    settle().await;
    assert_eq!(session.state(), SessionState::Live);
    assert_eq!(device.close_count(), 0);

    discovery.stop().await;
    assert_eq!(session.state(), SessionState::Live);
    session.close();
}

#[tokio::test]
async fn test_each_announcement_yields_a_new_session() {
    let (browser, announcements) = ChannelBrowser::new(8);
    let mut discovery = Discovery::new(Arc::new(browser));
    let mut events = discovery.subscribe();
    discovery.start().await.unwrap();

    announcements.send(added("Den", "10.0.0.5")).await.unwrap();
    announcements.send(added("Office", "10.0.0.6")).await.unwrap();

    let mut addresses = Vec::new();
    for _ in 0..2 {
        if let DiscoveryEvent::DeviceFound(session) = events.recv().await.unwrap() {
            addresses.push(session.address().to_string());
        }
    }
    assert_eq!(addresses, vec!["10.0.0.5", "10.0.0.6"]);

    discovery.stop().await;
}

#[tokio::test]
async fn test_stop_ends_listening() {
    let (browser, announcements) = ChannelBrowser::new(8);
    let mut discovery = Discovery::new(Arc::new(browser));
    let mut events = discovery.subscribe();
    discovery.start().await.unwrap();

    discovery.stop().await;
    assert!(!discovery.is_running());

    let _ = announcements.send(added("Den", "10.0.0.5")).await;
    settle().await;
    assert!(matches!(events.try_recv(), Ok(None)));
}

#[tokio::test]
async fn test_channel_browser_is_single_use() {
    let (browser, _announcements) = ChannelBrowser::new(8);
    let mut discovery = Discovery::new(Arc::new(browser));

    discovery.start().await.unwrap();
    assert!(matches!(discovery.start().await, Err(SoundTouchError::ChannelError(_))));
    assert!(!discovery.is_running());
}

#[tokio::test]
async fn test_announcement_source_ending_stops_discovery() {
    let (browser, announcements) = ChannelBrowser::new(8);
    let mut discovery = Discovery::new(Arc::new(browser));
    discovery.start().await.unwrap();

    drop(announcements);
    settle().await;
    assert!(!discovery.is_running());
}
