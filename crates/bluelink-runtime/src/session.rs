//! Session façade
//!
//! `BluetoothSession` is the single object external collaborators talk to.
//! It owns the registry, adapter state, the three stateful components and
//! the event bus, and runs the pump task that turns unsolicited driver
//! notifications into bus events.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{info, warn};

use bluelink_core::{
    BluetoothError, BusEvent, Device, DeviceAddress, EventBus, FileRef, Result, Transport,
    TransportEvent, TransportFault,
};

use crate::adapter::AdapterState;
use crate::bonding::BondingController;
use crate::config::SessionConfig;
use crate::discovery::{DiscoveryEvent, DiscoverySession};
use crate::registry::DeviceRegistry;
use crate::transfer::{self, TransferEngine, TransferEvent, TransferSession};

// ----------------------------------------------------------------------------
// Bluetooth Session
// ----------------------------------------------------------------------------

/// Façade over the Bluetooth session model
///
/// Owned and injectable: tests instantiate independent sessions, each with
/// its own transport, registry and bus.
pub struct BluetoothSession {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    registry: Arc<DeviceRegistry>,
    adapter: Arc<AdapterState>,
    bus: EventBus,
    discovery: DiscoverySession,
    bonding: BondingController,
    transfer: TransferEngine,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl BluetoothSession {
    /// Create a session over the given transport
    ///
    /// Probes the adapter once: a platform without one yields a session
    /// whose reads report powered-off and whose commands fail with
    /// `NotSupported`.
    pub async fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        let adapter = match transport.adapter_info().await {
            Ok(adapter_info) => Arc::new(AdapterState::new(adapter_info)),
            Err(fault) => {
                warn!(%fault, "bluetooth adapter unavailable");
                Arc::new(AdapterState::unsupported())
            }
        };

        let bus = EventBus::new(config.bus_capacity);
        let registry = Arc::new(DeviceRegistry::new());

        let discovery = DiscoverySession::new(
            Arc::clone(&transport),
            Arc::clone(&registry),
            config.clone(),
        );
        let bonding = BondingController::new(
            Arc::clone(&transport),
            Arc::clone(&registry),
            config.clone(),
        );
        let transfer = TransferEngine::new(
            Arc::clone(&transport),
            Arc::clone(&registry),
            config.clone(),
        );

        let notifications = transport.transport_events();
        let pump = tokio::spawn(pump_notifications(
            notifications,
            Arc::clone(&adapter),
            bus.clone(),
        ));

        Self {
            transport,
            config,
            registry,
            adapter,
            bus,
            discovery,
            bonding,
            transfer,
            pump: Mutex::new(Some(pump)),
        }
    }

    // ------------------------------------------------------------------
    // Adapter reads
    // ------------------------------------------------------------------

    /// Whether the platform has a Bluetooth adapter
    pub fn is_supported(&self) -> bool {
        self.adapter.is_supported()
    }

    /// Whether the local radio is powered on
    pub fn is_powered(&self) -> bool {
        self.adapter.is_powered()
    }

    /// Whether the adapter is discoverable
    pub fn is_visible(&self) -> bool {
        self.adapter.is_visible()
    }

    /// Adapter name presented to other devices
    pub fn adapter_name(&self) -> String {
        self.adapter.name()
    }

    // ------------------------------------------------------------------
    // Device queries
    // ------------------------------------------------------------------

    /// Immediate snapshot of known devices, presentation-sorted
    pub fn known_devices(&self) -> Vec<Device> {
        self.registry.known_devices()
    }

    /// Detail for one device
    ///
    /// Returns the cached record when no fresher data is pending (no scan
    /// is running); otherwise asks the transport and merges the answer.
    /// An address neither cached nor known to the transport fails with
    /// `DeviceNotFound`.
    pub async fn get_device(&self, address: &DeviceAddress) -> Result<Device> {
        self.ensure_supported()?;

        if let Some(cached) = self.registry.get(address) {
            if !self.discovery.is_scanning() {
                return Ok(cached);
            }
        }

        match timeout(
            self.config.command_timeout,
            self.transport.fetch_device(address),
        )
        .await
        {
            Ok(Ok(device)) => Ok(self.registry.upsert(device)),
            Ok(Err(TransportFault::DeviceNotFound { .. })) => self
                .registry
                .get(address)
                .ok_or_else(|| BluetoothError::device_not_found(address)),
            Ok(Err(fault)) => Err(fault.into()),
            Err(_) => Err(BluetoothError::internal("device detail fetch timed out")),
        }
    }

    /// Registry handle (read access for consumers and tests)
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------

    /// Start a discovery scan and return its event stream
    pub async fn discover_devices(&self) -> Result<mpsc::Receiver<DiscoveryEvent>> {
        self.ensure_supported()?;
        self.discovery.start().await
    }

    /// Stop the running scan; no-op while idle
    pub async fn stop_discovery(&self) -> Result<()> {
        self.discovery.stop().await
    }

    /// Whether a scan is running
    pub fn is_scanning(&self) -> bool {
        self.discovery.is_scanning()
    }

    // ------------------------------------------------------------------
    // Bonding
    // ------------------------------------------------------------------

    /// Pair with a device
    pub async fn create_bonding(&self, address: DeviceAddress) -> Result<()> {
        self.ensure_supported()?;
        self.bonding.pair(address).await
    }

    /// Unpair a bonded device
    pub async fn destroy_bonding(&self, address: DeviceAddress) -> Result<()> {
        self.ensure_supported()?;
        self.bonding.unpair(address).await
    }

    // ------------------------------------------------------------------
    // File transfer
    // ------------------------------------------------------------------

    /// Whether files can be sent to this device
    pub fn supports_sending_files(&self, device: &Device) -> bool {
        transfer::supports_sending_files(device)
    }

    /// Push a file to a bonded device and return the progress stream
    pub async fn send_file(
        &self,
        address: DeviceAddress,
        file: FileRef,
    ) -> Result<mpsc::Receiver<TransferEvent>> {
        self.ensure_supported()?;
        self.transfer.send_file(address, file).await
    }

    /// Last terminal transfer record
    pub fn last_transfer(&self) -> Option<TransferSession> {
        self.transfer.last_transfer()
    }

    /// Transfer currently in flight, if any
    pub fn active_transfer(&self) -> Option<TransferSession> {
        self.transfer.active_transfer()
    }

    // ------------------------------------------------------------------
    // Events and shutdown
    // ------------------------------------------------------------------

    /// Subscribe to the session event bus
    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.bus.subscribe()
    }

    /// Bus handle for publishing-side introspection
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Graceful shutdown
    ///
    /// Stops an active scan, waits up to the configured grace period for
    /// in-flight bonding and transfer operations to reach a terminal state,
    /// then stops the notification pump. In-flight work still pending when
    /// the grace expires is abandoned.
    pub async fn terminate(&self) {
        info!("session terminating");

        if self.discovery.is_scanning() {
            if let Err(error) = self.discovery.stop().await {
                warn!(%error, "failed to stop scan during shutdown");
            }
        }

        let deadline = Instant::now() + self.config.shutdown_grace;
        while (self.discovery.is_scanning()
            || self.bonding.has_in_flight()
            || self.transfer.is_busy())
            && Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        if self.bonding.has_in_flight() || self.transfer.is_busy() {
            warn!("shutdown grace expired with operations still in flight");
        }

        if let Some(pump) = self.pump.lock().expect("pump lock poisoned").take() {
            pump.abort();
        }
        info!("session terminated");
    }

    fn ensure_supported(&self) -> Result<()> {
        if self.adapter.is_supported() {
            Ok(())
        } else {
            Err(BluetoothError::NotSupported)
        }
    }
}

// ----------------------------------------------------------------------------
// Notification Pump
// ----------------------------------------------------------------------------

async fn pump_notifications(
    mut notifications: mpsc::UnboundedReceiver<TransportEvent>,
    adapter: Arc<AdapterState>,
    bus: EventBus,
) {
    while let Some(event) = notifications.recv().await {
        match event {
            TransportEvent::FileReceived { file_name } => {
                info!(file_name = %file_name, "file received");
                bus.publish(BusEvent::FileReceived { file_name });
            }
            other => {
                if let Some(bus_event) = adapter.apply(&other) {
                    bus.publish(bus_event);
                }
            }
        }
    }
}
