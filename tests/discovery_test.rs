//! Discovery flow tests against the in-memory radio.

mod support;

use std::sync::atomic::Ordering;

use smooth_bluetooth::bluetooth::DiscoveryEvent;
use smooth_bluetooth::{BluetoothError, BluetoothEvent, ConnectionState};
use support::{assert_no_event, device, manager, next_event, wait_until, ConnectPlan, FakeRadio};

#[tokio::test]
async fn test_no_paired_devices_triggers_discovery() {
    let radio = FakeRadio::new();
    let (manager, mut events) = manager(&radio);

    manager.try_connection().await.unwrap();
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryStarted));
    assert_eq!(radio.discovery_starts(), 1);
    assert!(radio.is_subscribed());

    let speaker = device("Speaker", "AA:00:00:00:00:0E", false);
    radio.discover(DiscoveryEvent::DeviceFound(speaker.clone()));
    // Reported twice by the scan; listed once
    radio.discover(DiscoveryEvent::DeviceFound(device("Speaker", "AA:00:00:00:00:0E", false)));
    radio.discover(DiscoveryEvent::Finished);

    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryFinished));
    let chooser = match next_event(&mut events).await {
        BluetoothEvent::DevicesFound { devices, chooser } => {
            assert_eq!(devices, vec![speaker.clone()]);
            chooser
        }
        other => panic!("unexpected event: {:?}", other),
    };
    assert_eq!(manager.devices(), vec![speaker.clone()]);
    assert!(!radio.is_subscribed());

    chooser.connect_to(speaker.clone());
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::Connecting(d) if d == speaker));
    assert_eq!(manager.state(), ConnectionState::Connecting);

    manager.stop().await;
}

#[tokio::test]
async fn test_empty_discovery_reports_no_devices() {
    let radio = FakeRadio::new();
    let (manager, mut events) = manager(&radio);

    manager.start_discovery().await.unwrap();
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryStarted));
    radio.discover(DiscoveryEvent::Finished);

    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryFinished));
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::NoDevicesFound));
    assert!(manager.devices().is_empty());
    assert_eq!(manager.state(), ConnectionState::Idle);

    manager.stop().await;
}

#[tokio::test]
async fn test_restarting_discovery_cancels_running_scan() {
    let radio = FakeRadio::new();
    let (manager, mut events) = manager(&radio);

    manager.start_discovery().await.unwrap();
    radio.discover(DiscoveryEvent::DeviceFound(device("Old", "AA:00:00:00:00:01", false)));
    wait_until(|| manager.devices().len() == 1).await;

    manager.start_discovery().await.unwrap();
    assert_eq!(radio.discovery_starts(), 2);
    assert_eq!(radio.discovery_cancels(), 1);
    assert!(manager.devices().is_empty());

    radio.discover(DiscoveryEvent::Finished);
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryStarted));
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryStarted));
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryFinished));
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::NoDevicesFound));
    assert_no_event(&mut events);

    manager.stop().await;
}

#[tokio::test]
async fn test_connect_during_discovery_ends_scan() {
    let radio = FakeRadio::new();
    radio.plan(ConnectPlan::Succeed);
    let (manager, mut events) = manager(&radio);

    manager.start_discovery().await.unwrap();
    let printer = device("Printer", "AA:00:00:00:00:0A", false);
    radio.discover(DiscoveryEvent::DeviceFound(printer.clone()));
    wait_until(|| manager.devices().len() == 1).await;

    manager.connect_to(printer.clone()).unwrap();
    assert!(!radio.is_subscribed());
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryStarted));
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryFinished));
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::Connecting(d) if d == printer));
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::Connected(d) if d == printer));
    assert!(radio.discovery_cancels() >= 1);
    // Found candidates stay listed
    assert_eq!(manager.devices(), vec![printer]);

    // A late scan result goes nowhere
    radio.discover(DiscoveryEvent::DeviceFound(device("Late", "AA:00:00:00:00:0B", false)));
    radio.discover(DiscoveryEvent::Finished);
    tokio::task::yield_now().await;
    assert_no_event(&mut events);
    assert_eq!(manager.devices().len(), 1);

    manager.stop().await;
}

#[tokio::test]
async fn test_restart_discards_previous_results() {
    let radio = FakeRadio::new();
    let (manager, mut events) = manager(&radio);

    manager.start_discovery().await.unwrap();
    radio.discover(DiscoveryEvent::DeviceFound(device("Old", "AA:00:00:00:00:01", false)));
    wait_until(|| manager.devices().len() == 1).await;
    manager.start_discovery().await.unwrap();

    let fresh = device("Fresh", "AA:00:00:00:00:02", false);
    radio.discover(DiscoveryEvent::DeviceFound(fresh.clone()));
    radio.discover(DiscoveryEvent::Finished);
    next_event(&mut events).await;
    next_event(&mut events).await;
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryFinished));
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DevicesFound { devices, .. } if devices == vec![fresh.clone()]));
    assert_eq!(manager.devices(), vec![fresh]);

    manager.stop().await;
}

#[tokio::test]
async fn test_cancel_discovery_reports_nothing() {
    let radio = FakeRadio::new();
    let (manager, mut events) = manager(&radio);

    manager.start_discovery().await.unwrap();
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryStarted));
    manager.cancel_discovery().await.unwrap();
    assert!(!radio.is_subscribed());

    radio.discover(DiscoveryEvent::Finished);
    tokio::task::yield_now().await;
    assert_no_event(&mut events);

    manager.stop().await;
}

#[tokio::test]
async fn test_stop_during_discovery() {
    let radio = FakeRadio::new();
    let (manager, mut events) = manager(&radio);

    manager.start_discovery().await.unwrap();
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::DiscoveryStarted));
    manager.stop().await;
    assert!(!radio.is_subscribed());

    radio.discover(DiscoveryEvent::Finished);
    assert!(matches!(manager.start_discovery().await, Err(BluetoothError::Stopped)));
    assert_no_event(&mut events);
}

#[tokio::test]
async fn test_disabled_radio_blocks_try_connection() {
    let radio = FakeRadio::new();
    radio.enabled.store(false, Ordering::SeqCst);
    radio.set_bonded(vec![device("Phone", "AA:00:00:00:00:01", true)]);
    let (manager, mut events) = manager(&radio);

    assert!(matches!(manager.try_connection().await, Err(BluetoothError::RadioDisabled)));
    assert!(matches!(next_event(&mut events).await, BluetoothEvent::RadioDisabled));
    assert_no_event(&mut events);
    assert!(manager.devices().is_empty());

    manager.stop().await;
}
