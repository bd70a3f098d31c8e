//! Discovery scan lifecycle tests

use std::sync::Arc;

use bluelink_harness::{test_address, test_device, MockTransport};
use bluelink_runtime::{
    BluetoothError, BluetoothSession, Device, DeviceClass, DiscoveryEvent, SessionConfig,
    Transport,
};
use bluelink_core::{ScanEvent, TransportFault};

async fn new_session(mock: &Arc<MockTransport>) -> BluetoothSession {
    BluetoothSession::new(Arc::clone(mock) as Arc<dyn Transport>, SessionConfig::default()).await
}

fn bonded_device(last: u8, name: &str) -> Device {
    let mut device = test_device(last, name, DeviceClass::Phone);
    device.is_bonded = true;
    device
}

#[tokio::test]
async fn scan_found_stop_scenario() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    let mut events = session.discover_devices().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Started)));
    assert!(session.is_scanning());

    mock.emit_scan_event(ScanEvent::Found(test_device(1, "Phone1", DeviceClass::Phone)))
        .await;

    let found = match events.recv().await {
        Some(DiscoveryEvent::DeviceFound(device)) => device,
        other => panic!("expected DeviceFound, got {:?}", other),
    };
    assert_eq!(found.name, "Phone1");
    assert_eq!(found.class_major, DeviceClass::Phone);
    assert!(!found.is_bonded);
    assert!(!found.is_connected);

    session.stop_discovery().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Finished)));
    assert!(!session.is_scanning());

    // the found device outlives the scan
    let cached = session.registry().get(&test_address(1)).unwrap();
    assert_eq!(cached.name, "Phone1");

    // nothing follows the terminal event
    assert!(events.recv().await.is_none());
}

#[tokio::test]
async fn second_start_is_rejected_while_scanning() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    let mut events = session.discover_devices().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Started)));

    let second = session.discover_devices().await;
    assert!(matches!(second, Err(BluetoothError::AlreadyScanning)));

    session.stop_discovery().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Finished)));
}

#[tokio::test]
async fn scan_can_restart_after_finishing() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    let mut events = session.discover_devices().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Started)));
    session.stop_discovery().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Finished)));

    // the session is idle again, a fresh scan may begin
    let mut second = session.discover_devices().await.unwrap();
    assert!(matches!(second.recv().await, Some(DiscoveryEvent::Started)));
    session.stop_discovery().await.unwrap();
    assert!(matches!(second.recv().await, Some(DiscoveryEvent::Finished)));
}

#[tokio::test]
async fn disappearance_never_touches_bonded_devices() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    // bonded before the scan starts
    session.registry().upsert(bonded_device(9, "Paired Phone"));

    let mut events = session.discover_devices().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Started)));

    mock.emit_scan_event(ScanEvent::Found(test_device(1, "One", DeviceClass::Computer)))
        .await;
    mock.emit_scan_event(ScanEvent::Found(test_device(2, "Two", DeviceClass::Wearable)))
        .await;
    // the driver also reports the bonded device during the scan
    mock.emit_scan_event(ScanEvent::Found(bonded_device(9, "Paired Phone")))
        .await;

    assert!(matches!(events.recv().await, Some(DiscoveryEvent::DeviceFound(_))));
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::DeviceFound(_))));
    let paired = match events.recv().await {
        Some(DiscoveryEvent::DeviceFound(device)) => device,
        other => panic!("expected DeviceFound, got {:?}", other),
    };
    assert!(paired.is_bonded);

    mock.emit_scan_event(ScanEvent::Lost(test_address(1))).await;
    // losing a bonded device produces no event and no removal
    mock.emit_scan_event(ScanEvent::Lost(test_address(9))).await;
    mock.stop_scan().await.unwrap();

    assert!(matches!(
        events.recv().await,
        Some(DiscoveryEvent::DeviceDisappeared(address)) if address == test_address(1)
    ));
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Finished)));

    // registry = found minus disappeared, union pre-existing bonded
    let addresses: Vec<_> = session
        .known_devices()
        .into_iter()
        .map(|device| device.address)
        .collect();
    assert_eq!(addresses.len(), 2);
    assert!(addresses.contains(&test_address(2)));
    assert!(addresses.contains(&test_address(9)));
}

#[tokio::test]
async fn lost_event_for_unseen_device_is_ignored() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    // known but not surfaced by this scan
    session
        .registry()
        .upsert(test_device(5, "Old", DeviceClass::Computer));

    let mut events = session.discover_devices().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Started)));

    mock.emit_scan_event(ScanEvent::Lost(test_address(5))).await;
    mock.stop_scan().await.unwrap();

    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Finished)));
    assert!(session.registry().contains(&test_address(5)));
}

#[tokio::test]
async fn transport_failure_mid_scan_fires_failed_not_finished() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    let mut events = session.discover_devices().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Started)));

    mock.emit_scan_event(ScanEvent::Failed(TransportFault::Internal {
        reason: "radio reset".to_string(),
    }))
    .await;

    assert!(matches!(
        events.recv().await,
        Some(DiscoveryEvent::Failed(BluetoothError::InternalError { .. }))
    ));
    assert!(events.recv().await.is_none());
    assert!(!session.is_scanning());
}

#[tokio::test]
async fn stop_while_idle_is_a_no_op() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    session.stop_discovery().await.unwrap();
    assert_eq!(mock.stop_scan_calls(), 0);
}

#[tokio::test]
async fn scan_start_fault_leaves_session_idle() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    mock.script_scan_start_fault(TransportFault::Internal {
        reason: "busy radio".to_string(),
    });

    let result = session.discover_devices().await;
    assert!(matches!(result, Err(BluetoothError::InternalError { .. })));
    assert!(!session.is_scanning());

    // the failed attempt does not poison later scans
    let mut events = session.discover_devices().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Started)));
    session.stop_discovery().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Finished)));
}
