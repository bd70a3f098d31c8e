//! Session façade, event bus and shutdown tests

use std::sync::Arc;

use bluelink_core::TransportEvent;
use bluelink_harness::{test_address, test_device, MockTransport};
use bluelink_runtime::{
    BluetoothError, BluetoothSession, BusEvent, DeviceClass, DiscoveryEvent, FileRef,
    SessionConfig, Transport,
};

async fn new_session(mock: &Arc<MockTransport>) -> BluetoothSession {
    BluetoothSession::new(Arc::clone(mock) as Arc<dyn Transport>, SessionConfig::default()).await
}

#[tokio::test]
async fn adapter_reads_mirror_the_driver_snapshot() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    assert!(session.is_supported());
    assert!(session.is_powered());
    assert!(session.is_visible());
    assert_eq!(session.adapter_name(), "Test Adapter");
}

#[tokio::test]
async fn missing_adapter_disables_every_command() {
    let mock = Arc::new(MockTransport::without_adapter());
    let session = new_session(&mock).await;

    assert!(!session.is_supported());
    assert!(!session.is_powered());
    assert!(!session.is_visible());

    assert!(matches!(
        session.discover_devices().await,
        Err(BluetoothError::NotSupported)
    ));
    assert!(matches!(
        session.get_device(&test_address(1)).await,
        Err(BluetoothError::NotSupported)
    ));
    assert!(matches!(
        session.create_bonding(test_address(1)).await,
        Err(BluetoothError::NotSupported)
    ));
    assert!(matches!(
        session.destroy_bonding(test_address(1)).await,
        Err(BluetoothError::NotSupported)
    ));
    assert!(matches!(
        session.send_file(test_address(1), FileRef::new("/tmp/a.txt")).await,
        Err(BluetoothError::NotSupported)
    ));
}

#[tokio::test]
async fn driver_notifications_surface_on_the_bus() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;
    let mut bus = session.subscribe();

    mock.emit_transport_event(TransportEvent::PoweredChanged(false));
    mock.emit_transport_event(TransportEvent::NameChanged("Watch".to_string()));
    // the adapter is already visible, this must not produce a bus event
    mock.emit_transport_event(TransportEvent::VisibilityChanged(true));
    mock.emit_transport_event(TransportEvent::FileReceived {
        file_name: "photo.jpg".to_string(),
    });

    assert_eq!(
        bus.recv().await.unwrap(),
        BusEvent::StateChanged { powered: false }
    );
    assert_eq!(
        bus.recv().await.unwrap(),
        BusEvent::NameChanged {
            name: "Watch".to_string()
        }
    );
    // the duplicate visibility notification was swallowed
    assert_eq!(
        bus.recv().await.unwrap(),
        BusEvent::FileReceived {
            file_name: "photo.jpg".to_string()
        }
    );

    assert!(!session.is_powered());
    assert_eq!(session.adapter_name(), "Watch");
}

#[tokio::test]
async fn get_device_serves_the_cache_while_idle() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    session
        .registry()
        .upsert(test_device(1, "Cached", DeviceClass::Phone));
    // the driver knows a different name, but no scan is running
    let mut fresh = test_device(1, "Fresh", DeviceClass::Phone);
    fresh.is_bonded = false;
    mock.add_remote(fresh);

    let device = session.get_device(&test_address(1)).await.unwrap();
    assert_eq!(device.name, "Cached");
}

#[tokio::test]
async fn get_device_asks_the_driver_during_a_scan() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    session
        .registry()
        .upsert(test_device(1, "Stale", DeviceClass::Phone));
    mock.add_remote(test_device(1, "Fresh", DeviceClass::Phone));

    let mut events = session.discover_devices().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Started)));

    let device = session.get_device(&test_address(1)).await.unwrap();
    assert_eq!(device.name, "Fresh");
    // the fresh answer was merged into the registry
    assert_eq!(session.registry().get(&test_address(1)).unwrap().name, "Fresh");

    session.stop_discovery().await.unwrap();
}

#[tokio::test]
async fn get_device_for_unknown_address_fails() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    assert!(matches!(
        session.get_device(&test_address(7)).await,
        Err(BluetoothError::DeviceNotFound { .. })
    ));
}

#[tokio::test]
async fn unknown_device_falls_back_to_the_driver() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    mock.add_remote(test_device(2, "Headset", DeviceClass::AudioVideo));

    let device = session.get_device(&test_address(2)).await.unwrap();
    assert_eq!(device.name, "Headset");
    assert!(session.registry().contains(&test_address(2)));
}

#[tokio::test]
async fn terminate_stops_an_active_scan() {
    let mock = Arc::new(MockTransport::new());
    let session = new_session(&mock).await;

    let mut events = session.discover_devices().await.unwrap();
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Started)));

    session.terminate().await;

    assert!(!session.is_scanning());
    assert_eq!(mock.stop_scan_calls(), 1);
    assert!(matches!(events.recv().await, Some(DiscoveryEvent::Finished)));

    // notifications after shutdown no longer reach the bus
    let mut bus = session.subscribe();
    mock.emit_transport_event(TransportEvent::PoweredChanged(false));
    assert!(matches!(
        bus.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}
